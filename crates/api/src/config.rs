//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOCKROOM_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOCKROOM_JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `STOCKROOM_HOST` - Bind address (default: 127.0.0.1)
//! - `STOCKROOM_PORT` - Listen port (default: 8080)
//! - `STOCKROOM_TOKEN_TTL_HOURS` - Bearer token lifetime (default: 24)
//! - `STOCKROOM_LOCK_TIMEOUT_MS` - Max wait for a product row lock (default: 3000)
//! - `STOCKROOM_ALLOW_ADMIN_SIGNUP` - Let anonymous callers register admins (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance sample rate (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bearer token signing and lifetime
    pub auth: AuthConfig,
    /// Upper bound on waiting for a contended product row
    pub lock_timeout: Duration,
    /// Sentry error tracking
    pub sentry: SentryConfig,
}

/// Token and registration settings.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC key for bearer tokens
    pub jwt_secret: SecretString,
    /// How long an issued token stays valid
    pub token_ttl: Duration,
    /// Whether `POST /auth/register` accepts `role: admin` without an admin token
    pub allow_admin_signup: bool,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .field("allow_admin_signup", &self.allow_admin_signup)
            .finish()
    }
}

/// Sentry client settings.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOCKROOM_DATABASE_URL")?;
        let host: IpAddr = parse_env_or_default("STOCKROOM_HOST", "127.0.0.1")?;
        let port: u16 = parse_env_or_default("STOCKROOM_PORT", "8080")?;
        let lock_timeout_ms: u64 = parse_env_or_default("STOCKROOM_LOCK_TIMEOUT_MS", "3000")?;
        if lock_timeout_ms == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "STOCKROOM_LOCK_TIMEOUT_MS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            host,
            port,
            auth: AuthConfig::from_env()?,
            lock_timeout: Duration::from_millis(lock_timeout_ms),
            sentry: SentryConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl AuthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = get_validated_secret("STOCKROOM_JWT_SECRET")?;
        validate_secret_length(&jwt_secret, "STOCKROOM_JWT_SECRET")?;

        let ttl_hours: u64 = parse_env_or_default("STOCKROOM_TOKEN_TTL_HOURS", "24")?;
        if ttl_hours == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "STOCKROOM_TOKEN_TTL_HOURS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            jwt_secret,
            token_ttl: Duration::from_secs(ttl_hours * 3600),
            allow_admin_signup: parse_env_or_default("STOCKROOM_ALLOW_ADMIN_SIGNUP", "false")?,
        })
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
/// Load only the database URL (`STOCKROOM_DATABASE_URL`, then `DATABASE_URL`).
///
/// Used by tooling that talks to the database but never issues tokens.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither variable is set.
pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
    let _ = dotenvy::dotenv();
    get_database_url("STOCKROOM_DATABASE_URL")
}

fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_bounds() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_placeholder_secrets_rejected() {
        for candidate in ["your-jwt-key-here", "changeme123", "my-jwt-secret-value"] {
            let err = validate_secret_strength(candidate, "STOCKROOM_JWT_SECRET").unwrap_err();
            assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
        }
    }

    #[test]
    fn test_low_entropy_secret_rejected() {
        let result = validate_secret_strength(&"ab".repeat(20), "STOCKROOM_JWT_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_random_secret_accepted() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "STOCKROOM_JWT_SECRET");
        assert!(result.is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        let result = validate_secret_length(&SecretString::from("k9$Lm2"), "STOCKROOM_JWT_SECRET");
        assert!(result.is_err());
        let ok = validate_secret_length(&SecretString::from("x".repeat(32)), "STOCKROOM_JWT_SECRET");
        assert!(ok.is_ok());
    }

    #[test]
    fn test_parse_env_or_default_uses_default_when_unset() {
        let port: u16 =
            parse_env_or_default("STOCKROOM_TEST_SURELY_UNSET_PORT", "8080").unwrap();
        assert_eq!(port, 8080);
        let flag: bool = parse_env_or_default("STOCKROOM_TEST_SURELY_UNSET_FLAG", "false").unwrap();
        assert!(!flag);
    }

    #[test]
    fn test_parse_env_or_default_reports_key_on_error() {
        let err = parse_env_or_default::<u16>("STOCKROOM_TEST_SURELY_UNSET_BAD", "eighty").unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "STOCKROOM_TEST_SURELY_UNSET_BAD")
        );
    }

    #[test]
    fn test_socket_addr() {
        let config = ApiConfig {
            database_url: SecretString::from("postgres://localhost/stockroom"),
            host: "0.0.0.0".parse().unwrap(),
            port: 8080,
            auth: AuthConfig {
                jwt_secret: SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6"),
                token_ttl: Duration::from_secs(3600),
                allow_admin_signup: false,
            },
            lock_timeout: Duration::from_secs(3),
            sentry: SentryConfig::default(),
        };

        let addr = config.socket_addr();
        assert_eq!(addr.to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn test_auth_config_debug_redacts_secret() {
        let auth = AuthConfig {
            jwt_secret: SecretString::from("super_sensitive_signing_key_1234567"),
            token_ttl: Duration::from_secs(60),
            allow_admin_signup: true,
        };
        let debug_output = format!("{auth:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_sensitive_signing_key"));
    }
}
