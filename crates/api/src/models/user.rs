//! User account domain types.
//!
//! Password digests never appear on these types; the credential store hands
//! them out separately.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{Email, UserId, UserRole};

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login name, unique.
    pub username: String,
    /// Contact email, unique.
    pub email: Email,
    /// Contact phone.
    pub phone: String,
    /// Access level.
    pub role: UserRole,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
    /// When the profile last changed.
    pub updated_at: DateTime<Utc>,
}

/// Validated registration data with the password already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Email,
    pub phone: String,
    pub role: UserRole,
    pub password_hash: String,
}

/// Profile fields to overwrite; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub email: Option<Email>,
    pub phone: Option<String>,
    pub role: Option<UserRole>,
}

impl ProfileChanges {
    pub fn apply_to(&self, user: &mut User) {
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(phone) = &self.phone {
            user.phone.clone_from(phone);
        }
        if let Some(role) = self.role {
            user.role = role;
        }
    }
}
