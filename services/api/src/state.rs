//! Application state shared across handlers

use anyhow::Result;
use auth::{JwtConfig, JwtService, PasswordHasher, RateLimiter, RateLimiterConfig};
use common::cache::{RedisConfig, RedisPool};
use common::database::{DatabaseConfig, init_pool, run_migrations};
use common::store::{DocumentStore, MemoryStore, PgDocumentStore};
use media::{MediaHost, MemoryMediaHost, S3MediaHost};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{AppConfig, MediaBackend, StoreBackend};
use crate::mail::{Mailer, OutboxMailer, SmtpConfig, SmtpMailer};
use crate::models::collections::{LIKES, SUBSCRIPTIONS, USERS};
use crate::repositories::Repositories;
use crate::session::SessionManager;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub repos: Repositories,
    pub sessions: SessionManager,
    pub hasher: PasswordHasher,
    pub media: Arc<dyn MediaHost>,
    pub mailer: Arc<dyn Mailer>,
    pub rate_limiter: RateLimiter,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        media: Arc<dyn MediaHost>,
        mailer: Arc<dyn Mailer>,
        jwt: JwtService,
        hasher: PasswordHasher,
        rate_limiter: RateLimiter,
        config: AppConfig,
    ) -> Self {
        let repos = Repositories::new(store.clone());
        let sessions = SessionManager::new(repos.users.clone(), jwt);
        Self {
            store,
            repos,
            sessions,
            hasher,
            media,
            mailer,
            rate_limiter,
            config: Arc::new(config),
        }
    }

    /// Wire every component from the environment
    pub async fn from_config(config: AppConfig) -> Result<Self> {
        let store: Arc<dyn DocumentStore> = match config.store_backend {
            StoreBackend::Postgres => {
                let db_config = DatabaseConfig::from_env()?;
                let pool = init_pool(&db_config).await?;
                run_migrations(&pool).await?;
                Arc::new(PgDocumentStore::new(pool))
            }
            StoreBackend::Memory => {
                warn!("Using the in-memory document store; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };
        ensure_indexes(store.as_ref()).await?;

        let media: Arc<dyn MediaHost> = match config.media_backend {
            MediaBackend::S3 => Arc::new(S3MediaHost::from_env().await),
            MediaBackend::Memory => {
                warn!("Using the in-memory media host");
                Arc::new(MemoryMediaHost::new())
            }
        };

        let smtp = SmtpConfig::from_env();
        let mailer: Arc<dyn Mailer> = if smtp.is_configured() {
            Arc::new(SmtpMailer::new(&smtp)?)
        } else {
            warn!("SMTP host not configured; emails are only logged");
            Arc::new(OutboxMailer::new())
        };

        let rate_limiter = match &config.redis_url {
            Some(url) => {
                let redis_config = RedisConfig {
                    url: url.clone(),
                    ..RedisConfig::from_env()?
                };
                let pool = RedisPool::new(&redis_config).await?;
                RateLimiter::with_redis(RateLimiterConfig::default(), Arc::new(pool))
            }
            None => RateLimiter::new(RateLimiterConfig::default()),
        };

        let jwt = JwtService::new(JwtConfig::from_env()?);
        info!("Application state initialized");

        Ok(Self::new(
            store,
            media,
            mailer,
            jwt,
            PasswordHasher::default(),
            rate_limiter,
            config,
        ))
    }
}

/// Unique indexes the handlers rely on
pub async fn ensure_indexes(store: &dyn DocumentStore) -> Result<()> {
    store.ensure_unique(USERS, &["username"]).await?;
    store.ensure_unique(USERS, &["email"]).await?;
    store.ensure_unique(LIKES, &["video", "likedBy"]).await?;
    store.ensure_unique(LIKES, &["comment", "likedBy"]).await?;
    store.ensure_unique(LIKES, &["tweet", "likedBy"]).await?;
    store
        .ensure_unique(SUBSCRIPTIONS, &["channel", "subscriber"])
        .await?;
    Ok(())
}
