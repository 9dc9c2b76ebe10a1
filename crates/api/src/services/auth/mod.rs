//! Authentication service.
//!
//! Username/password registration and login, bearer tokens, profile and
//! password management. Role checks on the caller happen at the HTTP
//! boundary; this service only validates the values it is given.

mod error;
mod password;
mod token;

pub use error::AuthError;
pub use password::{MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH, Passwords};
pub use token::{Claims, TokenError, TokenIssuer};

use serde::Deserialize;
use tracing::instrument;

use stockroom_core::{Email, UserId, UserRole};

use crate::db::{RepositoryError, UserStore};
use crate::models::{NewUser, Pagination, ProfileChanges, User};

use password::validate_password;

const USERNAME_LENGTH: std::ops::RangeInclusive<usize> = 3..=50;
const PHONE_LENGTH: std::ops::RangeInclusive<usize> = 10..=15;

/// Registration request.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Profile fields to change. Absent fields are left as they are.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
    passwords: &'a Passwords,
    tokens: &'a TokenIssuer,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(
        users: &'a dyn UserStore,
        passwords: &'a Passwords,
        tokens: &'a TokenIssuer,
    ) -> Self {
        Self {
            users,
            passwords,
            tokens,
        }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRole` if the role is not `admin` or `user`.
    /// Returns `AuthError::InvalidInput` if username, email or phone is malformed.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::RegistrationFailed` if the username or email is taken.
    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        let role = parse_role(registration.role.as_deref())?.unwrap_or_default();
        let username = validate_username(&registration.username)?;
        let email = parse_email(&registration.email)?;
        let phone = validate_phone(&registration.phone)?;
        validate_password(&registration.password)?;

        if self.users.find_by_username(&username).await?.is_some()
            || self.users.find_by_email(&email).await?.is_some()
        {
            return Err(AuthError::RegistrationFailed);
        }

        let password_hash = self.passwords.hash(&registration.password)?;

        let user = self
            .users
            .insert(&NewUser {
                username,
                email,
                phone,
                role,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::RegistrationFailed,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, role = %user.role, "User registered");
        Ok(user)
    }

    /// Login with username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<(String, User), AuthError> {
        let Some(user) = self.users.find_by_username(username.trim()).await? else {
            self.passwords.verify_missing(password);
            return Err(AuthError::InvalidCredentials);
        };
        let Some(digest) = self.users.password_hash(user.id).await? else {
            self.passwords.verify_missing(password);
            return Err(AuthError::InvalidCredentials);
        };

        if !self.passwords.verify(password, &digest) {
            tracing::warn!(user_id = %user.id, "Failed login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user)?;
        Ok((token, user))
    }

    /// Decode a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if the token is expired or does not verify.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        Ok(self.tokens.verify(token)?)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .find(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// List users ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database operation fails.
    pub async fn list_users(&self, page: Pagination) -> Result<Vec<User>, AuthError> {
        Ok(self.users.list(page).await?)
    }

    /// Update email, phone and role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRole` / `AuthError::InvalidInput` for malformed values.
    /// Returns `AuthError::EmailInUse` if another user has the email.
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    #[instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, AuthError> {
        let role = parse_role(update.role.as_deref())?;
        let email = update.email.as_deref().map(parse_email).transpose()?;
        let phone = update.phone.as_deref().map(validate_phone).transpose()?;

        if let Some(email) = &email
            && let Some(owner) = self.users.find_by_email(email).await?
            && owner.id != user_id
        {
            return Err(AuthError::EmailInUse);
        }

        let changes = ProfileChanges { email, phone, role };
        self.users
            .update_profile(user_id, &changes)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::EmailInUse,
                other => AuthError::Repository(other),
            })?
            .ok_or(AuthError::UserNotFound)
    }

    /// Replace a user's password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::IncorrectPassword` if `current` does not verify.
    /// Returns `AuthError::WeakPassword` if `new` doesn't meet requirements.
    /// Returns `AuthError::SamePassword` if `new` equals `current`.
    #[instrument(skip(self, current, new))]
    pub async fn change_password(
        &self,
        user_id: UserId,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        let digest = self
            .users
            .password_hash(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !self.passwords.verify(current, &digest) {
            return Err(AuthError::IncorrectPassword);
        }
        validate_password(new)?;
        if new == current {
            return Err(AuthError::SamePassword);
        }

        let digest = self.passwords.hash(new)?;
        if !self.users.update_password(user_id, &digest).await? {
            return Err(AuthError::UserNotFound);
        }

        tracing::info!(%user_id, "Password changed");
        Ok(())
    }

    /// Delete a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: UserId) -> Result<(), AuthError> {
        if !self.users.delete(user_id).await? {
            return Err(AuthError::UserNotFound);
        }
        tracing::info!(%user_id, "User deleted");
        Ok(())
    }
}

fn parse_role(role: Option<&str>) -> Result<Option<UserRole>, AuthError> {
    role.map(|r| r.trim().parse::<UserRole>())
        .transpose()
        .map_err(AuthError::from)
}

fn parse_email(email: &str) -> Result<Email, AuthError> {
    Email::parse(email).map_err(|e| AuthError::InvalidInput(format!("invalid email: {e}")))
}

fn validate_username(username: &str) -> Result<String, AuthError> {
    let username = username.trim();
    if !USERNAME_LENGTH.contains(&username.chars().count()) {
        return Err(AuthError::InvalidInput(format!(
            "username must be between {} and {} characters",
            USERNAME_LENGTH.start(),
            USERNAME_LENGTH.end()
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AuthError::InvalidInput(
            "username may only contain letters, digits and underscores".to_owned(),
        ));
    }
    Ok(username.to_owned())
}

fn validate_phone(phone: &str) -> Result<String, AuthError> {
    let phone = phone.trim();
    if !PHONE_LENGTH.contains(&phone.chars().count()) {
        return Err(AuthError::InvalidInput(format!(
            "phone must be between {} and {} characters",
            PHONE_LENGTH.start(),
            PHONE_LENGTH.end()
        )));
    }
    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
    {
        return Err(AuthError::InvalidInput(
            "phone may only contain digits, spaces and + - ( )".to_owned(),
        ));
    }
    Ok(phone.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;
    use crate::db::MemoryStore;

    struct Fixture {
        store: MemoryStore,
        passwords: Passwords,
        tokens: TokenIssuer,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: MemoryStore::new(),
                passwords: Passwords::with_cost(1024, 1).unwrap(),
                tokens: TokenIssuer::new(
                    &SecretString::from("Qm4Zt8Lw2Xc6Vb1Nj5Hk9Pd3Rf7Gs0Ya".to_owned()),
                    Duration::from_secs(3600),
                )
                .unwrap(),
            }
        }

        fn auth(&self) -> AuthService<'_> {
            AuthService::new(&self.store, &self.passwords, &self.tokens)
        }
    }

    fn registration(username: &str, email: &str) -> Registration {
        Registration {
            username: username.to_owned(),
            password: "s3cretpass".to_owned(),
            email: email.to_owned(),
            phone: "(555) 010-0199".to_owned(),
            role: Some("user".to_owned()),
        }
    }

    #[tokio::test]
    async fn test_alice_scenario() {
        let fx = Fixture::new();
        let auth = fx.auth();

        let alice = auth
            .register(registration("alice", "alice@example.com"))
            .await
            .unwrap();
        assert_eq!(alice.role, UserRole::User);

        let again = auth
            .register(registration("alice", "other@example.com"))
            .await;
        assert!(matches!(again, Err(AuthError::RegistrationFailed)));

        let (token, user) = auth.login("alice", "s3cretpass").await.unwrap();
        assert_eq!(user.id, alice.id);
        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.user_id, alice.id);
        assert_eq!(claims.username, "alice");
        assert!(!claims.is_admin());
    }

    #[tokio::test]
    async fn test_unknown_username_costs_a_verification() {
        let fx = Fixture::new();
        let auth = fx.auth();
        auth.register(registration("alice", "alice@example.com"))
            .await
            .unwrap();
        let before = fx.passwords.verification_count();

        let missing = auth.login("mallory", "s3cretpass").await.unwrap_err();
        assert!(matches!(missing, AuthError::InvalidCredentials));
        assert_eq!(fx.passwords.verification_count(), before + 1);

        let wrong = auth.login("alice", "wrongpass1").await.unwrap_err();
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(fx.passwords.verification_count(), before + 2);
    }

    #[tokio::test]
    async fn test_duplicate_email_hides_which_field() {
        let fx = Fixture::new();
        let auth = fx.auth();
        auth.register(registration("alice", "alice@example.com"))
            .await
            .unwrap();

        let err = auth
            .register(registration("bob", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::RegistrationFailed));
        assert_eq!(err.to_string(), "registration failed");
    }

    #[tokio::test]
    async fn test_register_validation_order() {
        let fx = Fixture::new();
        let auth = fx.auth();

        let mut bad_role = registration("al", "nope");
        bad_role.role = Some("superuser".to_owned());
        assert!(matches!(
            auth.register(bad_role).await,
            Err(AuthError::InvalidRole(_))
        ));

        let mut short = registration("alice", "alice@example.com");
        short.password = "short".to_owned();
        assert!(matches!(
            auth.register(short).await,
            Err(AuthError::WeakPassword(_))
        ));

        for (username, email, phone) in [
            ("al", "alice@example.com", "5550100199"),
            ("alice!", "alice@example.com", "5550100199"),
            ("alice", "not-an-email", "5550100199"),
            ("alice", "alice@example.com", "555"),
            ("alice", "alice@example.com", "555-0100-abc"),
        ] {
            let mut input = registration(username, email);
            input.phone = phone.to_owned();
            assert!(
                matches!(auth.register(input).await, Err(AuthError::InvalidInput(_))),
                "{username} {email} {phone}"
            );
        }
    }

    #[tokio::test]
    async fn test_role_defaults_to_user() {
        let fx = Fixture::new();
        let mut input = registration("carol", "carol@example.com");
        input.role = None;
        let user = fx.auth().register(input).await.unwrap();
        assert_eq!(user.role, UserRole::User);
    }

    #[tokio::test]
    async fn test_login_failures_are_uniform() {
        let fx = Fixture::new();
        let auth = fx.auth();
        auth.register(registration("alice", "alice@example.com"))
            .await
            .unwrap();

        let unknown = auth.login("mallory", "s3cretpass").await.unwrap_err();
        let wrong = auth.login("alice", "wrong-password").await.unwrap_err();
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn test_update_profile() {
        let fx = Fixture::new();
        let auth = fx.auth();
        let alice = auth
            .register(registration("alice", "alice@example.com"))
            .await
            .unwrap();
        auth.register(registration("bob", "bob@example.com"))
            .await
            .unwrap();

        let taken = auth
            .update_profile(
                alice.id,
                ProfileUpdate {
                    email: Some("bob@example.com".to_owned()),
                    ..ProfileUpdate::default()
                },
            )
            .await;
        assert!(matches!(taken, Err(AuthError::EmailInUse)));

        let own = auth
            .update_profile(
                alice.id,
                ProfileUpdate {
                    email: Some("alice@example.com".to_owned()),
                    phone: Some("020 7946 0000".to_owned()),
                    role: Some("admin".to_owned()),
                },
            )
            .await
            .unwrap();
        assert_eq!(own.phone, "020 7946 0000");
        assert_eq!(own.role, UserRole::Admin);
        assert_eq!(own.username, "alice");

        let bad_role = auth
            .update_profile(
                alice.id,
                ProfileUpdate {
                    role: Some("root".to_owned()),
                    ..ProfileUpdate::default()
                },
            )
            .await;
        assert!(matches!(bad_role, Err(AuthError::InvalidRole(_))));

        let missing = auth
            .update_profile(UserId::new(999), ProfileUpdate::default())
            .await;
        assert!(matches!(missing, Err(AuthError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_change_password() {
        let fx = Fixture::new();
        let auth = fx.auth();
        let alice = auth
            .register(registration("alice", "alice@example.com"))
            .await
            .unwrap();

        assert!(matches!(
            auth.change_password(alice.id, "wrong-pass", "n3wpassword").await,
            Err(AuthError::IncorrectPassword)
        ));
        assert!(matches!(
            auth.change_password(alice.id, "s3cretpass", "short").await,
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            auth.change_password(alice.id, "s3cretpass", "s3cretpass").await,
            Err(AuthError::SamePassword)
        ));

        auth.change_password(alice.id, "s3cretpass", "n3wpassword")
            .await
            .unwrap();
        assert!(auth.login("alice", "s3cretpass").await.is_err());
        assert!(auth.login("alice", "n3wpassword").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_user() {
        let fx = Fixture::new();
        let auth = fx.auth();
        let alice = auth
            .register(registration("alice", "alice@example.com"))
            .await
            .unwrap();

        auth.delete_user(alice.id).await.unwrap();
        assert!(matches!(
            auth.get_user(alice.id).await,
            Err(AuthError::UserNotFound)
        ));
        assert!(matches!(
            auth.delete_user(alice.id).await,
            Err(AuthError::UserNotFound)
        ));
        assert!(auth.list_users(Pagination::default()).await.unwrap().is_empty());
    }
}
