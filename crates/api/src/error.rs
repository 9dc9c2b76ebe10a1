//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Responses carry a stable
//! machine-checkable kind plus a human message:
//!
//! ```json
//! {"error": "insufficient_stock", "message": "insufficient stock: 70 available, 80 requested"}
//! ```
//!
//! Storage faults are captured to Sentry and answered with a generic message.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::auth::AuthError;
use crate::services::catalog::CatalogError;
use crate::services::ledger::LedgerError;

/// Machine-checkable error category sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidArgument,
    InsufficientStock,
    Unauthorized,
    Forbidden,
    StorageError,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::InvalidArgument => "invalid_argument",
            Self::InsufficientStock => "insufficient_stock",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::StorageError => "storage_error",
        }
    }

    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::InvalidArgument | Self::InsufficientStock => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::StorageError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Product catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Stock ledger operation failed.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The category reported to the client.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Catalog(err) => match err {
                CatalogError::NotFound => ErrorKind::NotFound,
                CatalogError::DuplicateSku(_) => ErrorKind::Conflict,
                CatalogError::InvalidArgument(_) => ErrorKind::InvalidArgument,
                CatalogError::Repository(_) => ErrorKind::StorageError,
            },
            Self::Ledger(err) => match err {
                LedgerError::InvalidArgument(_) => ErrorKind::InvalidArgument,
                LedgerError::ProductNotFound | LedgerError::TransactionNotFound => {
                    ErrorKind::NotFound
                }
                LedgerError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
                LedgerError::Storage(_) => ErrorKind::StorageError,
            },
            Self::Auth(err) => match err {
                AuthError::InvalidRole(_)
                | AuthError::InvalidInput(_)
                | AuthError::WeakPassword(_)
                | AuthError::IncorrectPassword
                | AuthError::SamePassword => ErrorKind::InvalidArgument,
                AuthError::RegistrationFailed | AuthError::EmailInUse => ErrorKind::Conflict,
                AuthError::InvalidCredentials | AuthError::Token(_) => ErrorKind::Unauthorized,
                AuthError::UserNotFound => ErrorKind::NotFound,
                AuthError::PasswordHash | AuthError::Repository(_) => ErrorKind::StorageError,
            },
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::BadRequest(_) => ErrorKind::InvalidArgument,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Internal(_) => ErrorKind::StorageError,
        }
    }

    fn message(&self) -> String {
        match self {
            // Don't expose internal error details to clients
            _ if self.kind() == ErrorKind::StorageError => "Internal server error".to_owned(),
            Self::Catalog(CatalogError::NotFound) => "Product not found".to_owned(),
            Self::Catalog(err) => err.to_string(),
            Self::Ledger(LedgerError::ProductNotFound) => "Product not found".to_owned(),
            Self::Ledger(LedgerError::TransactionNotFound) => "Transaction not found".to_owned(),
            Self::Ledger(err) => err.to_string(),
            Self::Auth(AuthError::InvalidCredentials) => "Invalid credentials".to_owned(),
            Self::Auth(AuthError::Token(_)) => "Invalid or expired token".to_owned(),
            Self::Auth(AuthError::UserNotFound) => "User not found".to_owned(),
            Self::Auth(AuthError::RegistrationFailed) => {
                "Registration failed: username or email already exists".to_owned()
            }
            Self::Auth(err) => err.to_string(),
            Self::NotFound(msg)
            | Self::BadRequest(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::Internal(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();

        // Capture server errors to Sentry
        if kind == ErrorKind::StorageError {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = json!({
            "error": kind.as_str(),
            "message": self.message(),
        });

        (kind.status(), Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Called once a bearer token verifies so errors are associated with the caller.
pub fn set_sentry_user(user_id: &impl ToString, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(username.to_owned()),
            ..Default::default()
        }));
    });
}
