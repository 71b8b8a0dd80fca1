//! One-time tokens for email verification and password reset
//!
//! The plaintext is mailed to the user; only its SHA-256 digest is stored.

use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Lifetime of a one-time token
pub const ONE_TIME_TOKEN_TTL: Duration = Duration::minutes(20);

/// Freshly generated token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneTimeToken {
    /// Delivered to the user, never persisted
    pub plain: String,
    /// SHA-256 hex digest of `plain`
    pub hashed: String,
    /// Expiry in epoch milliseconds
    pub expires_at: i64,
}

impl OneTimeToken {
    /// 20 random bytes, hex encoded
    pub fn generate(ttl: Duration) -> Self {
        let mut bytes = [0u8; 20];
        rand::thread_rng().fill_bytes(&mut bytes);
        let plain = hex::encode(bytes);
        let hashed = hash_token(&plain);
        let expires_at = (Utc::now() + ttl).timestamp_millis();

        Self {
            plain,
            hashed,
            expires_at,
        }
    }
}

/// SHA-256 hex digest used to look a token up
pub fn hash_token(plain: &str) -> String {
    hex::encode(Sha256::digest(plain.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate() {
        let token = OneTimeToken::generate(ONE_TIME_TOKEN_TTL);
        assert_eq!(token.plain.len(), 40);
        assert_eq!(token.hashed.len(), 64);
        assert_eq!(token.hashed, hash_token(&token.plain));
        assert_ne!(token.plain, token.hashed);

        let remaining = token.expires_at - Utc::now().timestamp_millis();
        assert!(remaining > 19 * 60 * 1000 && remaining <= 20 * 60 * 1000);
    }

    #[test]
    fn test_tokens_differ() {
        let a = OneTimeToken::generate(ONE_TIME_TOKEN_TTL);
        let b = OneTimeToken::generate(ONE_TIME_TOKEN_TTL);
        assert_ne!(a.plain, b.plain);
    }

    #[test]
    fn test_hash_token_is_sha256_hex() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
