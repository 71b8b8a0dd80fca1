//! S3-backed media host

use anyhow::Result;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{Client, primitives::ByteStream};
use std::env;
use tracing::{error, info, warn};

use crate::host::{MediaHost, MediaKind, MediaUpload, StoredMedia};
use crate::metadata_extractor::MetadataExtractor;

/// S3 configuration
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket_name: String,
    /// Prefix joined with the object key to form public URLs
    pub public_base_url: String,
}

impl S3Config {
    /// Create a new S3Config from environment variables
    ///
    /// # Environment Variables
    /// - `MEDIA_BUCKET_NAME`: Bucket for uploads (default: "media-bucket")
    /// - `MEDIA_PUBLIC_BASE_URL`: Public URL prefix (default: the bucket's S3 URL)
    pub fn from_env() -> Self {
        let bucket_name =
            env::var("MEDIA_BUCKET_NAME").unwrap_or_else(|_| "media-bucket".to_string());
        let public_base_url = env::var("MEDIA_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("https://{}.s3.amazonaws.com", bucket_name));

        Self {
            bucket_name,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    /// Object key behind a public URL, if the URL belongs to this bucket
    pub fn key_for<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.public_base_url.as_str())?
            .strip_prefix('/')
            .filter(|key| !key.is_empty())
    }
}

pub struct S3MediaHost {
    s3_client: Client,
    config: S3Config,
}

impl S3MediaHost {
    pub fn new(s3_client: Client, config: S3Config) -> Self {
        Self { s3_client, config }
    }

    /// Build a client from the default AWS credential chain
    pub async fn from_env() -> Self {
        let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let config = S3Config::from_env();
        info!("Using S3 bucket {} for media", config.bucket_name);
        Self::new(Client::new(&aws_config), config)
    }
}

#[async_trait]
impl MediaHost for S3MediaHost {
    async fn upload(&self, upload: MediaUpload) -> Result<StoredMedia> {
        let key = upload.object_key();

        let duration = if upload.kind == MediaKind::Video {
            match MetadataExtractor::duration_of(&upload.bytes).await {
                Ok(duration) => Some(duration),
                Err(e) => {
                    warn!("Could not read duration of {}: {}", upload.file_name, e);
                    Some(0.0)
                }
            }
        } else {
            None
        };

        let mut request = self
            .s3_client
            .put_object()
            .bucket(&self.config.bucket_name)
            .key(&key)
            .body(ByteStream::from(upload.bytes));
        if let Some(content_type) = &upload.content_type {
            request = request.content_type(content_type);
        }
        request.send().await.map_err(|e| {
            error!("Failed to upload {} to S3: {}", key, e);
            anyhow::anyhow!("Failed to upload media: {}", e)
        })?;

        info!("Uploaded media to S3: {}", key);
        Ok(StoredMedia {
            url: self.config.url_for(&key),
            duration,
        })
    }

    async fn remove(&self, url: &str) -> Result<()> {
        let key = self
            .config
            .key_for(url)
            .ok_or_else(|| anyhow::anyhow!("URL {} is not in bucket {}", url, self.config.bucket_name))?;

        self.s3_client
            .delete_object()
            .bucket(&self.config.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to delete media {}: {}", key, e))?;

        info!("Deleted media from S3: {}", key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_s3_config_from_env() {
        unsafe {
            env::set_var("MEDIA_BUCKET_NAME", "youtweet-media");
            env::remove_var("MEDIA_PUBLIC_BASE_URL");
        }

        let config = S3Config::from_env();
        assert_eq!(config.bucket_name, "youtweet-media");
        assert_eq!(
            config.public_base_url,
            "https://youtweet-media.s3.amazonaws.com"
        );

        unsafe {
            env::remove_var("MEDIA_BUCKET_NAME");
        }
    }

    #[test]
    fn test_url_key_mapping() {
        let config = S3Config {
            bucket_name: "b".to_string(),
            public_base_url: "https://cdn.example.com/media".to_string(),
        };
        let url = config.url_for("image/abc.png");
        assert_eq!(url, "https://cdn.example.com/media/image/abc.png");
        assert_eq!(config.key_for(&url), Some("image/abc.png"));
        assert_eq!(config.key_for("https://elsewhere.com/image/abc.png"), None);
        assert_eq!(config.key_for("https://cdn.example.com/media/"), None);
    }
}
