//! Bearer tokens.
//!
//! HS256 JWTs carrying `sub` (user id), `username`, `role`, `iat` and `exp`.
//! Verification allows no clock leeway.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockroom_core::{UserId, UserRole};

use crate::models::User;

/// Errors from issuing or verifying tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("invalid token")]
    Invalid,

    #[error("token lifetime out of range")]
    TtlOutOfRange,

    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

/// Payload as it appears on the wire.
#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    sub: String,
    username: String,
    role: UserRole,
    iat: i64,
    exp: i64,
}

/// Verified identity of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub user_id: UserId,
    pub username: String,
    pub role: UserRole,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Claims {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// True if the caller is `owner` or an admin.
    #[must_use]
    pub fn is_owner_or_admin(&self, owner: UserId) -> bool {
        self.user_id == owner || self.is_admin()
    }
}

/// Signs and verifies bearer tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: TimeDelta,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Create an issuer for tokens valid for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::TtlOutOfRange` if `ttl` is zero or too large.
    pub fn new(secret: &SecretString, ttl: Duration) -> Result<Self, TokenError> {
        let ttl = TimeDelta::from_std(ttl).map_err(|_| TokenError::TtlOutOfRange)?;
        if ttl <= TimeDelta::zero() {
            return Err(TokenError::TtlOutOfRange);
        }

        let key = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
            ttl,
        })
    }

    /// Issue a token for `user`, starting now.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        self.issue_at(user, Utc::now())
    }

    fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = TokenClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Signing)
    }

    /// Verify a token's signature and expiry and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired` for expired tokens and
    /// `TokenError::Invalid` for anything else that does not verify.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })?;
        let raw = data.claims;

        let user_id = raw
            .sub
            .parse::<i32>()
            .map(UserId::new)
            .map_err(|_| TokenError::Invalid)?;
        let issued_at = DateTime::from_timestamp(raw.iat, 0).ok_or(TokenError::Invalid)?;
        let expires_at = DateTime::from_timestamp(raw.exp, 0).ok_or(TokenError::Invalid)?;

        Ok(Claims {
            user_id,
            username: raw.username,
            role: raw.role,
            issued_at,
            expires_at,
        })
    }
}
