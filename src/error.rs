//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Every variant maps to one HTTP status and one stable `kind` string, so clients always
//! receive the same envelope:
//!
//! ```json
//! { "error": "session_expired", "message": "Refresh token expired or session invalid" }
//! ```
//!
//! Storage and hashing failures are logged server-side and reported with a generic
//! message; their details never reach the response body.
//!
//! `From` implementations for `sqlx::Error`, `validator::ValidationErrors`,
//! `jsonwebtoken::errors::Error`, and `bcrypt::BcryptError` allow the `?` operator
//! to be used directly inside handlers.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

/// Represents all possible errors that can occur within the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Malformed input, failed field validation, or a duplicate unique field (HTTP 400).
    Validation(String),
    /// Email/password pair did not match a stored user (HTTP 400).
    Authentication(String),
    /// Access token is malformed or its signature does not verify (HTTP 401).
    InvalidToken(String),
    /// Access token signature is valid but the token has expired (HTTP 401).
    ExpiredToken,
    /// No user owns the presented refresh token (HTTP 401).
    SessionNotFound(String),
    /// The refresh token is known but its session has expired (HTTP 401).
    SessionExpired(String),
    /// Authentication is required but no credential was presented (HTTP 401).
    Unauthorized(String),
    /// The resource does not exist or is not owned by the caller (HTTP 404).
    NotFound(String),
    /// Error originating from the storage layer (HTTP 500).
    Database(String),
    /// Any other unexpected server-side failure (HTTP 500).
    Internal(String),
}

impl AppError {
    /// Stable machine-readable identifier placed in the `error` field of the envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::Authentication(_) => "authentication_error",
            AppError::InvalidToken(_) => "invalid_token",
            AppError::ExpiredToken => "expired_token",
            AppError::SessionNotFound(_) => "session_not_found",
            AppError::SessionExpired(_) => "session_expired",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::NotFound(_) => "not_found",
            AppError::Database(_) | AppError::Internal(_) => "internal_error",
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg)
            | AppError::Authentication(msg)
            | AppError::InvalidToken(msg)
            | AppError::SessionNotFound(msg)
            | AppError::SessionExpired(msg)
            | AppError::Unauthorized(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::ExpiredToken => "Access token has expired".to_string(),
            AppError::Database(_) | AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation Error: {}", msg),
            AppError::Authentication(msg) => write!(f, "Authentication Error: {}", msg),
            AppError::InvalidToken(msg) => write!(f, "Invalid Token: {}", msg),
            AppError::ExpiredToken => write!(f, "Expired Token"),
            AppError::SessionNotFound(msg) => write!(f, "Session Not Found: {}", msg),
            AppError::SessionExpired(msg) => write!(f, "Session Expired: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Database(msg) => write!(f, "Database Error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

/// Converts `AppError` variants into `HttpResponse` objects carrying the JSON envelope.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Authentication(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidToken(_)
            | AppError::ExpiredToken
            | AppError::SessionNotFound(_)
            | AppError::SessionExpired(_)
            | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if matches!(self, AppError::Database(_) | AppError::Internal(_)) {
            log::error!("{}", self);
        }
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "message": self.public_message(),
        }))
    }
}

/// `RowNotFound` becomes `NotFound`; everything else is a storage failure.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            _ => AppError::Database(error.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::Validation(error.to_string())
    }
}

/// Separates expiry from every other verification failure.
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        match error.kind() {
            JwtErrorKind::ExpiredSignature => AppError::ExpiredToken,
            _ => AppError::InvalidToken(error.to_string()),
        }
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::Internal(error.to_string())
    }
}
