//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! STOCKROOM_USER_PASSWORD='...' stockroom user create \
//!     -u alice -e alice@example.com -p 5550100199 -r admin
//! ```
//!
//! This is the only way to create the first admin when
//! `STOCKROOM_ALLOW_ADMIN_SIGNUP` is off.
//!
//! # Environment Variables
//!
//! - `STOCKROOM_USER_PASSWORD` - Password for the new account
//! - Everything the API server reads (see `stockroom_api::config`)

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use stockroom_api::config::{ApiConfig, ConfigError};
use stockroom_api::db::{self, PgUserStore};
use stockroom_api::services::auth::{
    AuthError, AuthService, Passwords, Registration, TokenError, TokenIssuer,
};

const PASSWORD_VAR: &str = "STOCKROOM_USER_PASSWORD";

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserCommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Token configuration error: {0}")]
    Token(#[from] TokenError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Validation or storage failure reported by the auth service.
    #[error("Could not create user: {0}")]
    Auth(#[from] AuthError),
}

/// Create a user account through the same validation as `POST /auth/register`.
///
/// # Returns
///
/// The id of the created user.
///
/// # Errors
///
/// Returns an error if the password variable is missing, the input is
/// rejected, or the username or email is already taken.
pub async fn create(
    username: String,
    email: String,
    phone: String,
    role: String,
) -> Result<i32, UserCommandError> {
    let password = std::env::var(PASSWORD_VAR)
        .map(SecretString::from)
        .map_err(|_| UserCommandError::MissingEnvVar(PASSWORD_VAR))?;

    let config = ApiConfig::from_env()?;
    let tokens = TokenIssuer::new(&config.auth.jwt_secret, config.auth.token_ttl)?;
    let passwords = Passwords::new();

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;
    let users = PgUserStore::new(pool.clone());

    tracing::info!(%username, %role, "Creating user");
    let user = AuthService::new(&users, &passwords, &tokens)
        .register(Registration {
            username,
            password: password.expose_secret().to_owned(),
            email,
            phone,
            role: Some(role),
        })
        .await?;

    tracing::info!(
        "User created successfully! ID: {}, Username: {}, Role: {}",
        user.id,
        user.username,
        user.role
    );

    pool.close().await;
    Ok(user.id.as_i32())
}
