//! Rate limiter for account recovery endpoints
//!
//! Fixed window: the first hit for a key opens a window of
//! `window_seconds`, and at most `max_attempts` hits are allowed inside it.
//! Counters live in Redis when a pool is configured, otherwise in process.

use anyhow::Result;
use common::cache::RedisPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of attempts allowed per window
    pub max_attempts: u32,
    /// Time window in seconds
    pub window_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            window_seconds: 900, // 15 minutes
        }
    }
}

/// Rate limiter entry
#[derive(Debug)]
struct RateLimiterEntry {
    /// Number of attempts in the current window
    attempts: u32,
    /// Start of the current window
    window_start: Instant,
}

#[derive(Clone)]
enum Backend {
    Local(Arc<Mutex<HashMap<String, RateLimiterEntry>>>),
    Redis(Arc<RedisPool>),
}

/// Rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    /// Rate limiter configuration
    config: RateLimiterConfig,
    backend: Backend,
}

impl RateLimiter {
    /// Create an in-process rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            backend: Backend::Local(Arc::new(Mutex::new(HashMap::new()))),
        }
    }

    /// Create a rate limiter whose counters are shared through Redis
    pub fn with_redis(config: RateLimiterConfig, redis_pool: Arc<RedisPool>) -> Self {
        Self {
            config,
            backend: Backend::Redis(redis_pool),
        }
    }

    /// Record a hit for `key` and report whether it is within the limit
    pub async fn is_allowed(&self, key: &str) -> Result<bool> {
        let allowed = match &self.backend {
            Backend::Local(entries) => self.hit_local(entries, key).await,
            Backend::Redis(pool) => {
                let redis_key = format!("rate_limit:{}", key);
                let count = pool
                    .incr_with_ttl(&redis_key, self.config.window_seconds)
                    .await?;
                count <= u64::from(self.config.max_attempts)
            }
        };

        if !allowed {
            warn!("Rate limit exceeded for key {}", key);
        }
        Ok(allowed)
    }

    async fn hit_local(&self, entries: &Mutex<HashMap<String, RateLimiterEntry>>, key: &str) -> bool {
        let mut entries = entries.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_seconds);

        // Closed windows carry no state worth keeping
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.window_start) < window);
        if entries.len() < before {
            debug!("Dropped {} expired rate limit windows", before - entries.len());
        }

        let entry = entries.entry(key.to_string()).or_insert(RateLimiterEntry {
            attempts: 0,
            window_start: now,
        });

        if entry.attempts >= self.config.max_attempts {
            return false;
        }

        entry.attempts += 1;
        true
    }

    /// Get the rate limiter configuration
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Keys with an open window in the in-process backend
    #[cfg(test)]
    async fn tracked_keys(&self) -> usize {
        match &self.backend {
            Backend::Local(entries) => entries.lock().await.len(),
            Backend::Redis(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allows_three_per_window() {
        let limiter = RateLimiter::new(RateLimiterConfig::default());
        for _ in 0..3 {
            assert!(limiter.is_allowed("10.0.0.1").await.expect("check"));
        }
        assert!(!limiter.is_allowed("10.0.0.1").await.expect("check"));
        // Other clients are unaffected
        assert!(limiter.is_allowed("10.0.0.2").await.expect("check"));
    }

    #[tokio::test]
    async fn test_window_expiry_resets_counter() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_attempts: 1,
            window_seconds: 0,
        });
        assert!(limiter.is_allowed("k").await.expect("check"));
        // A zero-length window has always elapsed
        assert!(limiter.is_allowed("k").await.expect("check"));
    }

    #[tokio::test]
    async fn test_expired_keys_are_evicted() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_attempts: 3,
            window_seconds: 0,
        });
        for client in ["10.0.0.1", "10.0.0.2", "10.0.0.3"] {
            assert!(limiter.is_allowed(client).await.expect("check"));
        }
        // Only the key just hit is left; the others' windows had closed
        assert_eq!(limiter.tracked_keys().await, 1);

        let limiter = RateLimiter::new(RateLimiterConfig::default());
        for client in ["10.0.0.1", "10.0.0.2"] {
            assert!(limiter.is_allowed(client).await.expect("check"));
        }
        assert_eq!(limiter.tracked_keys().await, 2);
    }
}
