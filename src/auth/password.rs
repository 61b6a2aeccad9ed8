/// Secret Hashing and Verification
///
/// One-way salted hashing of secret material (passwords and refresh tokens)
/// with bcrypt. bcrypt only reads the first 72 bytes of its input, while
/// signed tokens for the same subject share much longer prefixes, so every
/// secret is reduced to its SHA-256 hex digest before it reaches bcrypt.

use bcrypt::{hash, verify};
use sha2::{Digest, Sha256};

use crate::error::{AppError, ConfigError};

pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;

/// Salted, slow hasher for secret material
#[derive(Debug, Clone, Copy)]
pub struct SecretHasher {
    cost: u32,
}

impl SecretHasher {
    /// Create a hasher with the given bcrypt work factor
    ///
    /// # Errors
    /// Returns error if the cost is outside the range bcrypt accepts
    pub fn new(cost: u32) -> Result<Self, ConfigError> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(ConfigError::InvalidValue(format!(
                "bcrypt cost {} outside {}..={}",
                cost, MIN_COST, MAX_COST
            )));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a secret. Output differs on every call for the same input.
    ///
    /// # Errors
    /// Returns error if bcrypt fails (salt generation)
    pub fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        hash(digest(plaintext), self.cost)
            .map_err(|e| AppError::Internal(format!("Secret hashing failed: {}", e)))
    }

    /// Verify a secret against a stored hash.
    ///
    /// A malformed stored hash verifies as `false`.
    pub fn verify(&self, plaintext: &str, stored_hash: &str) -> bool {
        match verify(digest(plaintext), stored_hash) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(error = %e, "Stored secret hash is malformed");
                false
            }
        }
    }
}

fn digest(plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plaintext.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> SecretHasher {
        SecretHasher::new(MIN_COST).expect("valid cost")
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        let hash = hasher.hash("pw1").expect("Failed to hash secret");

        assert_ne!(hash, "pw1");
        assert!(hash.starts_with("$2"));
        assert!(hasher.verify("pw1", &hash));
    }

    #[test]
    fn test_verify_wrong_secret() {
        let hasher = hasher();
        let hash = hasher.hash("pw1").expect("Failed to hash secret");

        assert!(!hasher.verify("pw2", &hash));
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = hasher();
        let first = hasher.hash("pw1").expect("Failed to hash secret");
        let second = hasher.hash("pw1").expect("Failed to hash secret");

        assert_ne!(first, second);
        assert!(hasher.verify("pw1", &first));
        assert!(hasher.verify("pw1", &second));
    }

    #[test]
    fn test_long_secrets_with_shared_prefix_are_distinguished() {
        let hasher = hasher();
        let prefix = "x".repeat(200);
        let first = format!("{}first", prefix);
        let second = format!("{}second", prefix);

        let hash = hasher.hash(&first).expect("Failed to hash secret");
        assert!(hasher.verify(&first, &hash));
        assert!(!hasher.verify(&second, &hash));
    }

    #[test]
    fn test_malformed_hash_verifies_false() {
        let hasher = hasher();
        assert!(!hasher.verify("pw1", "not-a-bcrypt-hash"));
        assert!(!hasher.verify("pw1", ""));
    }

    #[test]
    fn test_cost_bounds() {
        assert!(SecretHasher::new(MIN_COST - 1).is_err());
        assert!(SecretHasher::new(MAX_COST + 1).is_err());
        assert_eq!(SecretHasher::new(10).unwrap().cost(), 10);
    }
}
