//! One-way password hashing.

use anyhow::{Context, Result};
use bcrypt::{DEFAULT_COST, hash, verify};

/// Hashes plaintext secrets and checks them against a stored hash.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String>;
    fn verify(&self, plaintext: &str, hashed: &str) -> Result<bool>;
}

/// bcrypt-backed [`PasswordHasher`].
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String> {
        hash(plaintext, self.cost).context("Password hashing failed")
    }

    fn verify(&self, plaintext: &str, hashed: &str) -> Result<bool> {
        verify(plaintext, hashed).context("Password verification failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = BcryptHasher::new(4);
        let hashed = hasher.hash("Secret123!").unwrap();

        assert_ne!(hashed, "Secret123!");
        assert!(hasher.verify("Secret123!", &hashed).unwrap());
        assert!(!hasher.verify("wrong", &hashed).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        let hasher = BcryptHasher::new(4);
        assert!(hasher.verify("Secret123!", "not-a-bcrypt-hash").is_err());
    }
}
