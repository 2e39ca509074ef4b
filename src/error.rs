//! Error types for ConnectHub
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.
//! Every error body has the shape `{"message": "..."}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("Resource not found")]
    NotFound,

    /// Authentication required (401)
    #[error("Unauthorized")]
    Unauthorized,

    /// Access denied (403)
    #[error("Access denied")]
    Forbidden,

    /// Validation error (400)
    #[error("{0}")]
    Validation(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Signature verification failed (401)
    #[error("Invalid signature")]
    InvalidSignature,

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token signing error (500)
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),

    /// Route-level failure with a fixed client message (500)
    ///
    /// The underlying cause is logged before it is replaced.
    #[error("{0}")]
    Failed(&'static str),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }
}

impl IntoResponse for AppError {
    /// Maps each error variant to an HTTP status and a `{"message"}` body.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, message, error_type) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string(), "not_found"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string(), "unauthorized"),
            AppError::InvalidSignature => (
                StatusCode::UNAUTHORIZED,
                "Unauthorized".to_string(),
                "invalid_signature",
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, self.to_string(), "forbidden"),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "validation"),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
                "database",
            ),
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), "config"),
            AppError::Encryption(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "encryption",
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "internal",
            ),
            AppError::Failed(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.to_string(), "failed"),
        };

        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[error_type]).inc();

        let body = Json(serde_json::json!({
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Replace server-side failures with a route's fixed message.
///
/// Client errors (400/401/403/404) pass through unchanged so that
/// validation messages still reach the caller.
pub trait OrFail<T> {
    fn or_fail(self, message: &'static str) -> Result<T>;
}

impl<T> OrFail<T> for Result<T> {
    fn or_fail(self, message: &'static str) -> Result<T> {
        self.map_err(|error| match error {
            AppError::Database(_)
            | AppError::Internal(_)
            | AppError::Encryption(_)
            | AppError::Config(_) => {
                tracing::error!(error = %error, "{}", message);
                AppError::Failed(message)
            }
            other => other,
        })
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
