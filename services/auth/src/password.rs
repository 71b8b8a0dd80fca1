//! Password hashing
//!
//! A [`HashedPassword`] can only come from hashing a plaintext or from
//! loading a stored document, so the `password` field of a user can never
//! hold a plaintext value.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::error;

/// bcrypt cost used for stored passwords
pub const DEFAULT_COST: u32 = 10;

/// A bcrypt hash
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashedPassword(String);

impl HashedPassword {
    /// Check a plaintext against this hash
    ///
    /// Runs on the blocking pool. A malformed stored hash verifies as false.
    pub async fn verify(&self, plain: &str) -> Result<bool> {
        let hash = self.0.clone();
        let plain = plain.to_string();
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash))
            .await?
            .unwrap_or_else(|e| {
                error!("Stored password hash could not be parsed: {}", e);
                false
            });
        Ok(verified)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HashedPassword(..)")
    }
}

/// Hashes plaintext passwords with a fixed bcrypt cost
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a plaintext on the blocking pool
    pub async fn hash(&self, plain: &str) -> Result<HashedPassword> {
        let cost = self.cost;
        let plain = plain.to_string();
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
            .await?
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
        Ok(HashedPassword(hash))
    }
}
