use chrono::{Duration, Utc};
use jsonwebtoken::{encode, DecodingKey, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::session::SessionStore;
use crate::config::JwtConfig;
use crate::error::AppError;

/// The two token classes. They differ only in signing secret and lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Short-lived, presented on ordinary requests.
    Access,
    /// Long-lived, only exchanged for a new access token.
    Refresh,
}

/// What a token vouches for: a user and the session it was issued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPayload {
    pub user_id: Uuid,
    /// Session id (JWT ID).
    pub jti: Uuid,
}

/// Represents the claims encoded within a JWT.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    #[serde(flatten)]
    pub payload: TokenPayload,
    /// Issued at, seconds since epoch.
    pub iat: i64,
    /// Expiration, seconds since epoch.
    pub exp: i64,
}

impl Claims {
    pub fn new(payload: TokenPayload, lifetime: Duration) -> Result<Self, AppError> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(lifetime)
            .ok_or_else(|| AppError::InternalServerError("token lifetime out of range".into()))?;
        Ok(Self {
            payload,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        })
    }
}

/// Signing material and lifetime of one token class.
#[derive(Clone)]
pub struct TokenKey {
    pub(crate) encoding: EncodingKey,
    pub(crate) decoding: DecodingKey,
    pub(crate) lifetime: Duration,
}

impl TokenKey {
    pub fn new(secret: &str, lifetime: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        }
    }

    pub fn sign(&self, payload: TokenPayload) -> Result<String, AppError> {
        encode(
            &Header::default(),
            &Claims::new(payload, self.lifetime)?,
            &self.encoding,
        )
        .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
    }
}

/// Access and refresh key pair, loaded once at startup.
#[derive(Clone)]
pub struct TokenKeys {
    pub access: TokenKey,
    pub refresh: TokenKey,
}

impl TokenKeys {
    pub fn from_config(config: &JwtConfig) -> Self {
        Self {
            access: TokenKey::new(&config.access_secret, config.access_expires_in),
            refresh: TokenKey::new(&config.refresh_secret, config.refresh_expires_in),
        }
    }

    pub fn get(&self, kind: TokenKind) -> &TokenKey {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }
}

/// Access and refresh tokens handed out at login.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Mints tokens bound to server-side sessions.
#[derive(Clone)]
pub struct TokenIssuer {
    keys: TokenKeys,
    sessions: SessionStore,
}

impl TokenIssuer {
    pub fn new(keys: TokenKeys, sessions: SessionStore) -> Self {
        Self { keys, sessions }
    }

    /// Opens one session for `user_id` and signs both tokens against it.
    ///
    /// The session lives as long as the refresh token.
    pub async fn generate_tokens(&self, user_id: Uuid) -> Result<TokenPair, AppError> {
        let jti = self
            .sessions
            .create(user_id, self.keys.refresh.lifetime)
            .await?;
        let payload = TokenPayload { user_id, jti };

        Ok(TokenPair {
            access_token: self.keys.access.sign(payload)?,
            refresh_token: self.keys.refresh.sign(payload)?,
        })
    }

    /// Signs a new access token for an already validated payload.
    ///
    /// The session is reused as is: no new row, and the refresh token is not rotated.
    pub fn refresh_access_token(&self, payload: TokenPayload) -> Result<String, AppError> {
        self.keys.access.sign(payload)
    }
}
