//! Server configuration
//!
//! Read from the environment through the `config` crate. Component settings
//! (database, Redis, JWT, S3, SMTP) are read by their own `from_env`
//! constructors.

use anyhow::Result;
use config::{Config, Environment};
use serde::Deserialize;

/// Which [`common::store::DocumentStore`] backs the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// Which [`media::MediaHost`] stores uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaBackend {
    S3,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `*` mirrors the request origin
    pub cors_origin: String,
    /// Sets the `Secure` attribute on auth cookies
    pub cookie_secure: bool,
    /// Base of the links sent in verification emails
    pub public_base_url: String,
    /// Password reset links are `{forgot_password_redirect_url}/{token}`
    pub forgot_password_redirect_url: String,
    pub upload_limit_bytes: usize,
    pub store_backend: StoreBackend,
    pub media_backend: MediaBackend,
    /// Shares rate-limit counters through Redis when set
    #[serde(default)]
    pub redis_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origin: "*".to_string(),
            cookie_secure: true,
            public_base_url: "http://localhost:8000".to_string(),
            forgot_password_redirect_url: "http://localhost:3000/reset-password".to_string(),
            upload_limit_bytes: 100 * 1024 * 1024,
            store_backend: StoreBackend::Postgres,
            media_backend: MediaBackend::S3,
            redis_url: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Environment Variables
    /// - `HOST`, `PORT`: Listen address (default: 0.0.0.0:8000)
    /// - `CORS_ORIGIN`: Allowed origin (default: "*")
    /// - `COOKIE_SECURE`: Secure auth cookies (default: true)
    /// - `PUBLIC_BASE_URL`: Base URL for email links (default: "http://localhost:8000")
    /// - `FORGOT_PASSWORD_REDIRECT_URL`: Password reset page (default: "http://localhost:3000/reset-password")
    /// - `UPLOAD_LIMIT_BYTES`: Maximum request body size (default: 100 MiB)
    /// - `STORE_BACKEND`: "postgres" or "memory" (default: "postgres")
    /// - `MEDIA_BACKEND`: "s3" or "memory" (default: "s3")
    /// - `REDIS_URL`: Redis for the rate limiter (default: unset, in-process)
    pub fn from_env() -> Result<Self> {
        let defaults = AppConfig::default();
        let settings = Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("cors_origin", defaults.cors_origin)?
            .set_default("cookie_secure", defaults.cookie_secure)?
            .set_default("public_base_url", defaults.public_base_url)?
            .set_default(
                "forgot_password_redirect_url",
                defaults.forgot_password_redirect_url,
            )?
            .set_default("upload_limit_bytes", defaults.upload_limit_bytes as i64)?
            .set_default("store_backend", "postgres")?
            .set_default("media_backend", "s3")?
            .add_source(Environment::default().try_parsing(true))
            .build()?;

        let mut config: AppConfig = settings.try_deserialize()?;
        config.public_base_url = config.public_base_url.trim_end_matches('/').to_string();
        config.forgot_password_redirect_url = config
            .forgot_password_redirect_url
            .trim_end_matches('/')
            .to_string();
        config.redis_url = config.redis_url.filter(|url| !url.trim().is_empty());
        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
