//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Every failure of the authentication core ends up as one of its variants:
//! token and credential problems become `Unauthorized` with a generic message,
//! an unrecognised password-hash scheme becomes `Unsupported`, and faults of the
//! backing store become `DatabaseError`.
//!
//! `AppError` implements `actix_web::error::ResponseError` to seamlessly convert
//! application errors into appropriate HTTP responses with JSON bodies.
//! It also provides `From` trait implementations for `sqlx::Error`,
//! `validator::ValidationErrors`, `jsonwebtoken::errors::Error` and the password
//! module's `PasswordError`, allowing for easy conversion using the `?` operator.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::auth::password::PasswordError;

/// Represents all possible errors that can occur within the application.
///
/// Each variant corresponds to a specific type of error, carrying a message
/// detailing the issue. These errors are then converted into appropriate HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication failed or is missing (HTTP 401).
    /// The message is always generic: it never says which factor failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// The caller is authenticated but its role does not allow the operation (HTTP 403).
    #[error("Forbidden: {0}")]
    Forbidden(String),
    /// Malformed or invalid request (HTTP 400).
    #[error("Bad Request: {0}")]
    BadRequest(String),
    /// Requested resource was not found (HTTP 404).
    #[error("Not Found: {0}")]
    NotFound(String),
    /// The request conflicts with existing state, e.g. a duplicate email (HTTP 409).
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Input validation failed (HTTP 422 Unprocessable Entity).
    /// Wraps errors from the `validator` crate.
    #[error("Validation Error: {0}")]
    ValidationError(String),
    /// A stored password hash uses a scheme this build cannot verify (HTTP 500).
    /// This is a configuration problem, not a client mistake.
    #[error("Unsupported: {0}")]
    Unsupported(String),
    /// The backing store failed (HTTP 500). Never retried locally.
    #[error("Database Error: {0}")]
    DatabaseError(String),
    /// Any other unexpected server-side error (HTTP 500).
    #[error("Internal Server Error: {0}")]
    InternalServerError(String),
}

impl AppError {
    /// Shorthand for the one message every token failure is reported with.
    pub fn invalid_token() -> Self {
        AppError::Unauthorized("Invalid token".into())
    }

    /// Shorthand for the one message every login failure is reported with.
    pub fn invalid_credentials() -> Self {
        AppError::Unauthorized("Invalid credentials".into())
    }

    /// A gated request that carries no token, or reaches a handler without an identity.
    pub fn missing_token() -> Self {
        AppError::Unauthorized("Missing token".into())
    }

    fn message(&self) -> &str {
        match self {
            AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::ValidationError(msg)
            | AppError::Unsupported(msg)
            | AppError::DatabaseError(msg)
            | AppError::InternalServerError(msg) => msg,
        }
    }
}

/// Converts `AppError` variants into `HttpResponse` objects.
///
/// Server-side failures are logged here, once, when they leave the application.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unsupported(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}", self);
        }
        HttpResponse::build(status).json(json!({
            "error": self.message()
        }))
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// `sqlx::Error::RowNotFound` maps to `AppError::NotFound`,
/// everything else is a storage fault.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            _ => AppError::DatabaseError(error.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(error: sqlx::migrate::MigrateError) -> AppError {
        AppError::DatabaseError(error.to_string())
    }
}

/// Converts `validator::ValidationErrors` into `AppError::ValidationError`.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

/// Converts `jsonwebtoken::errors::Error` into `AppError::Unauthorized`.
///
/// The underlying reason (bad signature, expiry, garbage) is deliberately dropped.
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        log::debug!("token rejected: {}", error);
        AppError::invalid_token()
    }
}

impl From<PasswordError> for AppError {
    fn from(error: PasswordError) -> AppError {
        match error {
            PasswordError::Unsupported(_) => AppError::Unsupported(error.to_string()),
            _ => AppError::InternalServerError(error.to_string()),
        }
    }
}
