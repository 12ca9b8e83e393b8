// ============================
// crates/backend-lib/src/error.rs
// ============================
//! Central error type + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;
use thiserror::Error;

use crate::storage::StoreError;

/// Why an authenticated caller was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    /// Access token presented where a refresh token is required, or the reverse
    WrongTokenKind,
    /// Refresh token is in the revocation set
    Revoked,
    /// Caller does not own the chirp
    NotAuthor,
}

impl fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForbiddenReason::WrongTokenKind => write!(f, "wrong token kind"),
            ForbiddenReason::Revoked => write!(f, "token revoked"),
            ForbiddenReason::NotAuthor => write!(f, "author mismatch"),
        }
    }
}

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(ForbiddenReason),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(ForbiddenReason::NotAuthor) => StatusCode::FORBIDDEN,
            AppError::Forbidden(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::StoreUnavailable(_) | AppError::Hashing(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VAL_001",
            AppError::Unauthenticated(_) => "AUTH_001",
            AppError::Forbidden(ForbiddenReason::WrongTokenKind) => "AUTH_002",
            AppError::Forbidden(ForbiddenReason::Revoked) => "AUTH_003",
            AppError::Forbidden(ForbiddenReason::NotAuthor) => "AUTH_004",
            AppError::NotFound(_) => "NF_001",
            AppError::StoreUnavailable(_) => "STORE_001",
            AppError::Hashing(_) => "INT_002",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Unauthenticated(_) => "Authentication failed".to_string(),
            AppError::Forbidden(ForbiddenReason::NotAuthor) => {
                "Chirp author invalid authorization".to_string()
            },
            AppError::Forbidden(_) => "Authorization rejected".to_string(),
            AppError::NotFound(_) => "Resource not found".to_string(),
            AppError::StoreUnavailable(_) | AppError::Hashing(_) | AppError::Internal(_) => {
                "Something went wrong".to_string()
            },
        }
    }

    /// Server-side failures that should show up in the logs
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        if self.is_server_error() {
            tracing::error!(code = error_code, error = %self, "request failed");
        } else {
            tracing::debug!(code = error_code, error = %self, "request rejected");
        }

        // Use detailed messages in development, sanitized in production
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        let body = serde_json::json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("background task failed: {err}"))
    }
}
