//! Redis-backed windowed counters
//!
//! Counters live under `{prefix}:{key}` and expire a fixed number of seconds
//! after their first increment. The rate limiter uses them so that several
//! API instances share one budget per client.

use anyhow::Result;
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use tracing::{debug, info};

/// Configuration for Redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
    /// Namespace prepended to every key
    pub key_prefix: String,
}

impl RedisConfig {
    /// Create a new RedisConfig from environment variables
    ///
    /// # Environment Variables
    /// - `REDIS_URL`: Redis connection URL (default: "redis://localhost:6379")
    /// - `REDIS_KEY_PREFIX`: Key namespace (default: "youtweet")
    pub fn from_env() -> Result<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let key_prefix = std::env::var("REDIS_KEY_PREFIX")
            .ok()
            .map(|prefix| prefix.trim().trim_end_matches(':').to_string())
            .filter(|prefix| !prefix.is_empty())
            .unwrap_or_else(|| "youtweet".to_string());

        Ok(RedisConfig { url, key_prefix })
    }
}

/// Shared Redis client handing out multiplexed connections
pub struct RedisPool {
    client: Client,
    key_prefix: String,
}

impl RedisPool {
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.clone())?;
        info!("Redis client initialized with URL: {}", config.url);
        Ok(RedisPool {
            client,
            key_prefix: config.key_prefix.clone(),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }

    /// Increment a counter, starting its TTL when the key is created
    ///
    /// Returns the value after the increment. The expiry is only set on the
    /// first increment, so the window is fixed from the first hit.
    pub async fn incr_with_ttl(&self, key: &str, ttl_seconds: u64) -> Result<u64> {
        let key = self.namespaced(key);
        let mut conn = self.connection().await?;
        let count: i64 = conn.incr(&key, 1).await?;
        if count == 1 {
            let _: bool = conn.expire(&key, ttl_seconds as i64).await?;
            debug!("Started {}s window for {}", ttl_seconds, key);
        }
        Ok(count.max(0) as u64)
    }

    /// Seconds until the counter's window closes, `None` when there is no
    /// open window
    pub async fn window_remaining(&self, key: &str) -> Result<Option<u64>> {
        let mut conn = self.connection().await?;
        let ttl: i64 = conn.ttl(self.namespaced(key)).await?;
        Ok((ttl >= 0).then_some(ttl as u64))
    }

    /// Drop a counter and its window
    pub async fn reset(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: u64 = conn.del(self.namespaced(key)).await?;
        Ok(())
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn local() -> RedisConfig {
        RedisConfig {
            url: "redis://localhost:6379".to_string(),
            key_prefix: "youtweet-test".to_string(),
        }
    }

    #[test]
    #[serial]
    fn test_redis_config_from_env() {
        unsafe {
            std::env::set_var("REDIS_URL", "redis://cache:6380");
            std::env::set_var("REDIS_KEY_PREFIX", "api:");
        }

        let config = RedisConfig::from_env().unwrap();
        assert_eq!(config.url, "redis://cache:6380");
        assert_eq!(config.key_prefix, "api");

        unsafe {
            std::env::remove_var("REDIS_URL");
            std::env::remove_var("REDIS_KEY_PREFIX");
        }
        let config = RedisConfig::from_env().unwrap();
        assert_eq!(config.url, "redis://localhost:6379");
        assert_eq!(config.key_prefix, "youtweet");
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_counter_window() -> Result<()> {
        let pool = RedisPool::new(&local()).await?;
        assert!(pool.health_check().await?);

        let key = "test_counter";
        pool.reset(key).await?;
        assert_eq!(pool.window_remaining(key).await?, None);

        assert_eq!(pool.incr_with_ttl(key, 5).await?, 1);
        assert_eq!(pool.incr_with_ttl(key, 5).await?, 2);
        assert!(pool.window_remaining(key).await?.is_some_and(|ttl| ttl <= 5));

        pool.reset(key).await?;
        Ok(())
    }
}
