//! Route-level authorization guards.
//!
//! A route lists the guards it needs; [`authorize`] evaluates them in order
//! and stops at the first denial.
//!
//! ```rust,ignore
//! authorize(Some(&claims), &[Guard::Admin, Guard::NotSelf(id)])?;
//! ```

use axum::http::StatusCode;

use stockroom_core::UserId;

use crate::error::AppError;
use crate::services::auth::Claims;

/// One authorization requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Any verified caller.
    Authenticated,
    /// Caller has the admin role.
    Admin,
    /// Caller is the given user or an admin.
    OwnerOrAdmin(UserId),
    /// Caller is not the given user.
    NotSelf(UserId),
}

/// A failed guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub status: StatusCode,
    pub reason: &'static str,
}

impl Denial {
    const fn new(status: StatusCode, reason: &'static str) -> Self {
        Self { status, reason }
    }
}

impl Guard {
    fn check(self, claims: Option<&Claims>) -> Result<(), Denial> {
        let Some(claims) = claims else {
            return Err(Denial::new(
                StatusCode::UNAUTHORIZED,
                "Authentication required",
            ));
        };

        match self {
            Self::Authenticated => Ok(()),
            Self::Admin if claims.is_admin() => Ok(()),
            Self::Admin => Err(Denial::new(StatusCode::FORBIDDEN, "Admin access required")),
            Self::OwnerOrAdmin(owner) if claims.is_owner_or_admin(owner) => Ok(()),
            Self::OwnerOrAdmin(_) => Err(Denial::new(StatusCode::FORBIDDEN, "Access denied")),
            Self::NotSelf(user) if claims.user_id == user => Err(Denial::new(
                StatusCode::BAD_REQUEST,
                "Cannot perform this action on your own account",
            )),
            Self::NotSelf(_) => Ok(()),
        }
    }
}

/// Evaluate `guards` in order against the caller.
///
/// # Errors
///
/// Returns the first [`Denial`].
pub fn authorize(claims: Option<&Claims>, guards: &[Guard]) -> Result<(), Denial> {
    guards.iter().try_for_each(|guard| guard.check(claims))
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        let reason = denial.reason.to_owned();
        match denial.status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized(reason),
            StatusCode::BAD_REQUEST => Self::BadRequest(reason),
            _ => Self::Forbidden(reason),
        }
    }
}
