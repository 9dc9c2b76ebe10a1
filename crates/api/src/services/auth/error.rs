//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

use super::token::TokenError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Role outside the allowed set.
    #[error(transparent)]
    InvalidRole(#[from] stockroom_core::UnknownRole),

    /// Malformed username, email or phone.
    #[error("{0}")]
    InvalidInput(String),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Username or email taken. Deliberately does not say which.
    #[error("registration failed")]
    RegistrationFailed,

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Email already belongs to another account.
    #[error("email already in use")]
    EmailInUse,

    /// The current password did not verify.
    #[error("current password is incorrect")]
    IncorrectPassword,

    /// New password equals the current one.
    #[error("new password must be different from the current password")]
    SamePassword,

    /// Token issuance or verification failed.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
