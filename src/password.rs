/// Argon2id password hashing and verification
///
/// Hashes use the PHC string format so the salt and parameters are embedded
/// in the stored value; verification needs no side channel.
use crate::error::{AuthError, AuthResult};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordVerifier, SaltString};
use argon2::{Argon2, PasswordHasher as _};

/// Password hashing service
#[derive(Debug, Clone, Default)]
pub struct PasswordHasher;

impl PasswordHasher {
    pub fn new() -> Self {
        Self
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, password: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Internal(format!("Password hashing failed: {}", e)))?;

        Ok(hash.to_string())
    }

    /// Verify a candidate password against a stored PHC-formatted hash.
    ///
    /// A malformed stored hash is treated as a non-match, never surfaced as
    /// an error to the caller.
    pub fn verify(&self, password: &str, encoded: &str) -> bool {
        let parsed = match PasswordHash::new(encoded) {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!("Malformed password hash in store: {}", e);
                return false;
            }
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_round_trip() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash("Secret1!").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("Secret1!", &hash));
    }

    #[test]
    fn test_wrong_password_rejected() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash("Secret1!").unwrap();

        assert!(!hasher.verify("Secret2!", &hash));
    }

    #[test]
    fn test_salts_differ_between_hashes() {
        let hasher = PasswordHasher::new();
        let first = hasher.hash("Secret1!").unwrap();
        let second = hasher.hash("Secret1!").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("Secret1!", &first));
        assert!(hasher.verify("Secret1!", &second));
    }

    #[test]
    fn test_malformed_hash_is_non_match() {
        let hasher = PasswordHasher::new();

        assert!(!hasher.verify("Secret1!", "not-a-phc-string"));
        assert!(!hasher.verify("Secret1!", ""));
        assert!(!hasher.verify("Secret1!", "$argon2id$garbage"));
    }
}
