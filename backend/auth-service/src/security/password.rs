//! Password hashing and verification using Argon2id
use argon2::{
    password_hash::{PasswordHasher as _, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use rand::{distributions::Alphanumeric, Rng};

use crate::error::{AuthError, Result};

/// Salted, constant-time password comparison
#[cfg_attr(test, mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    /// Hash a password into a PHC string suitable for storage
    fn hash(&self, password: &str) -> Result<String>;

    /// `true` only if `password` matches `phc`. A malformed hash never matches.
    fn verify(&self, password: &str, phc: &str) -> bool;

    /// Burn one verification's worth of work against a fixed hash.
    ///
    /// Called for unknown identifiers so a failed login costs the same either way.
    fn verify_dummy(&self, password: &str);
}

#[derive(Clone)]
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
    dummy_hash: String,
}

impl Argon2PasswordHasher {
    pub fn new() -> Result<Self> {
        let argon2 = Argon2::default();
        let throwaway: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let dummy_hash = hash_with(&argon2, &throwaway)?;
        Ok(Self { argon2, dummy_hash })
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, password: &str) -> Result<String> {
        hash_with(&self.argon2, password)
    }

    fn verify(&self, password: &str, phc: &str) -> bool {
        let parsed = match PasswordHash::new(phc) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!(error = %e, "Stored password hash is not a valid PHC string");
                return false;
            }
        };

        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    fn verify_dummy(&self, password: &str) {
        let _ = self.verify(password, &self.dummy_hash);
    }
}

fn hash_with(argon2: &Argon2<'_>, password: &str) -> Result<String> {
    let salt = SaltString::generate(rand::thread_rng());
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::Internal("Failed to hash password".to_string()))
}

/// Check that `phc` parses as a PHC hash string
pub fn is_valid_phc(phc: &str) -> bool {
    PasswordHash::new(phc).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = Argon2PasswordHasher::new().unwrap();
        let hash = hasher.hash("password123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("password123", &hash));
    }

    #[test]
    fn test_wrong_password() {
        let hasher = Argon2PasswordHasher::new().unwrap();
        let hash = hasher.hash("password123").unwrap();
        assert!(!hasher.verify("password124", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = Argon2PasswordHasher::new().unwrap();
        let a = hasher.hash("same").unwrap();
        let b = hasher.hash("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_never_matches() {
        let hasher = Argon2PasswordHasher::new().unwrap();
        assert!(!hasher.verify("password123", "not-a-phc-string"));
        assert!(!is_valid_phc("not-a-phc-string"));
    }
}
