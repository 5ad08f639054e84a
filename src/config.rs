use std::env;

use chrono::{Duration, Utc};
use thiserror::Error;

use crate::duration::{parse_duration, DurationError};

/// Startup configuration errors. Any of these aborts the process.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} is not a valid duration: {source}")]
    Duration {
        key: &'static str,
        source: DurationError,
    },
    #[error("{0} must be a positive duration")]
    NonPositive(&'static str),
    #[error("{0} reaches past the latest representable date")]
    OutOfRange(&'static str),
    #[error("{0} must be a number")]
    NotANumber(&'static str),
}

/// Secrets and lifetimes for the two token classes.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_expires_in: Duration,
    pub refresh_expires_in: Duration,
}

pub struct Config {
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub server_port: u16,
    pub server_host: String,
    pub jwt: JwtConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let lifetime = |key: &'static str| -> Result<Duration, ConfigError> {
            let value = parse_duration(&required(key)?)
                .map_err(|source| ConfigError::Duration { key, source })?;
            if value <= Duration::zero() {
                return Err(ConfigError::NonPositive(key));
            }
            if Utc::now().checked_add_signed(value).is_none() {
                return Err(ConfigError::OutOfRange(key));
            }
            Ok(value)
        };

        let jwt = JwtConfig {
            access_secret: required("JWT_ACCESS_SECRET")?,
            refresh_secret: required("JWT_REFRESH_SECRET")?,
            access_expires_in: lifetime("JWT_ACCESS_EXPIRES_IN")?,
            refresh_expires_in: lifetime("JWT_REFRESH_EXPIRES_IN")?,
        };

        let server_port = match lookup("SERVER_PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| ConfigError::NotANumber("SERVER_PORT"))?,
            None => 8080,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            server_port,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            jwt,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}
