//! Password hashing.
//!
//! Argon2id with PHC-string digests. Only the digest is ever stored.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use super::AuthError;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length.
pub const MAX_PASSWORD_LENGTH: usize = 100;

/// Plaintext behind the decoy digest checked for unknown accounts.
const DECOY_PASSWORD: &str = "stockroom-decoy-password";

/// Argon2id hasher.
///
/// Holds a decoy digest made with the same parameters, so that a login for
/// an unknown username spends as long in Argon2 as a wrong password does.
#[derive(Clone)]
pub struct Passwords {
    argon2: Argon2<'static>,
    decoy: Option<String>,
    #[cfg(test)]
    verifications: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

impl Default for Passwords {
    fn default() -> Self {
        Self::new()
    }
}

impl Passwords {
    /// Hasher with the `argon2` crate's default cost.
    #[must_use]
    pub fn new() -> Self {
        Self::from_argon2(Argon2::default())
    }

    /// Hasher with an explicit memory (KiB) and iteration cost.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordHash` if the parameters are out of range.
    pub fn with_cost(memory_kib: u32, iterations: u32) -> Result<Self, AuthError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|_| AuthError::PasswordHash)?;
        Ok(Self::from_argon2(Argon2::new(
            Algorithm::Argon2id,
            Version::V0x13,
            params,
        )))
    }

    fn from_argon2(argon2: Argon2<'static>) -> Self {
        let salt = SaltString::generate(&mut OsRng);
        let decoy = argon2
            .hash_password(DECOY_PASSWORD.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .ok();
        if decoy.is_none() {
            tracing::warn!("Could not build decoy password digest");
        }
        Self {
            argon2,
            decoy,
            #[cfg(test)]
            verifications: std::sync::Arc::default(),
        }
    }

    /// Hash a password into a PHC string.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordHash` if hashing fails.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| AuthError::PasswordHash)
    }

    /// Check a password against a stored digest. Unparseable digests never match.
    #[must_use]
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        #[cfg(test)]
        self.verifications
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        PasswordHash::new(digest).is_ok_and(|parsed| {
            self.argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
    }

    /// Spend one verification's worth of work on a password that has no
    /// account behind it.
    pub fn verify_missing(&self, password: &str) {
        match &self.decoy {
            Some(decoy) => {
                let _ = self.verify(password, decoy);
            }
            None => {
                let _ = self.hash(password);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn verification_count(&self) -> usize {
        self.verifications.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// Validate password meets requirements.
pub(crate) fn validate_password(password: &str) -> Result<(), AuthError> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cheap() -> Passwords {
        Passwords::with_cost(1024, 1).unwrap()
    }

    #[test]
    fn test_hash_verifies() {
        let passwords = cheap();
        let digest = passwords.hash("correct horse").unwrap();

        assert!(digest.starts_with("$argon2id$"));
        assert_ne!(digest, "correct horse");
        assert!(passwords.verify("correct horse", &digest));
        assert!(!passwords.verify("wrong horse", &digest));
    }

    #[test]
    fn test_salts_differ() {
        let passwords = cheap();
        let a = passwords.hash("same password").unwrap();
        let b = passwords.hash("same password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_missing_account_runs_a_verification() {
        let passwords = cheap();
        let decoy = passwords.decoy.clone().unwrap();
        assert!(decoy.starts_with("$argon2id$v=19$m=1024,t=1,p=1$"));

        passwords.verify_missing(DECOY_PASSWORD);
        passwords.verify_missing("anything");
        assert_eq!(passwords.verification_count(), 2);
    }

    #[test]
    fn test_malformed_digest_never_matches() {
        assert!(!cheap().verify("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_password_length_bounds() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password(&"x".repeat(MAX_PASSWORD_LENGTH)).is_ok());
        assert!(validate_password(&"x".repeat(MAX_PASSWORD_LENGTH + 1)).is_err());
    }
}
