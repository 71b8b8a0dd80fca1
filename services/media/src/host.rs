use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

/// What an uploaded file is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Object key prefix
    pub fn prefix(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

/// A file received from a client
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub kind: MediaKind,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl MediaUpload {
    /// Fresh object key: `{kind}/{uuid}.{ext}`, the extension taken from the
    /// client file name when it is plain alphanumeric
    pub fn object_key(&self) -> String {
        let extension = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "bin".to_string());
        format!("{}/{}.{}", self.kind.prefix(), Uuid::new_v4(), extension)
    }
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMedia {
    /// Public URL of the object
    pub url: String,
    /// Length in seconds, for videos
    pub duration: Option<f64>,
}

/// Storage for user media
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Store a file and return its public URL
    async fn upload(&self, upload: MediaUpload) -> Result<StoredMedia>;

    /// Delete the object behind a URL returned by [`MediaHost::upload`]
    async fn remove(&self, url: &str) -> Result<()>;
}
