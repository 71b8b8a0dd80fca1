//! In-memory media host for tests and local runs

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::info;

use crate::host::{MediaHost, MediaKind, MediaUpload, StoredMedia};

const URL_PREFIX: &str = "memory://";

/// Keeps uploaded objects in a map keyed by URL
pub struct MemoryMediaHost {
    objects: Mutex<HashMap<String, Bytes>>,
    video_duration: f64,
}

impl Default for MemoryMediaHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMediaHost {
    pub fn new() -> Self {
        Self::with_video_duration(0.0)
    }

    /// Report `duration` seconds for every uploaded video
    pub fn with_video_duration(duration: f64) -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            video_duration: duration,
        }
    }

    pub async fn contains(&self, url: &str) -> bool {
        self.objects.lock().await.contains_key(url)
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }
}

#[async_trait]
impl MediaHost for MemoryMediaHost {
    async fn upload(&self, upload: MediaUpload) -> Result<StoredMedia> {
        let url = format!("{}{}", URL_PREFIX, upload.object_key());
        let duration = (upload.kind == MediaKind::Video).then_some(self.video_duration);
        self.objects.lock().await.insert(url.clone(), upload.bytes);
        info!("Stored media object {}", url);
        Ok(StoredMedia { url, duration })
    }

    async fn remove(&self, url: &str) -> Result<()> {
        self.objects
            .lock()
            .await
            .remove(url)
            .map(|_| ())
            .ok_or_else(|| anyhow::anyhow!("No media object at {}", url))
    }
}
