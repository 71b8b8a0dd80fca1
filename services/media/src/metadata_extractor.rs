//! Video metadata through `ffprobe`

use anyhow::Result;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{error, info};
use uuid::Uuid;

/// Reads container metadata from uploaded videos
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Duration in seconds of an uploaded video
    ///
    /// The bytes are written to a temporary file for `ffprobe` and removed
    /// afterwards.
    pub async fn duration_of(bytes: &Bytes) -> Result<f64> {
        let path: PathBuf = std::env::temp_dir().join(format!("upload-{}", Uuid::new_v4()));
        tokio::fs::write(&path, bytes).await?;

        let result = Self::probe_duration(&path.to_string_lossy()).await;

        if let Err(e) = tokio::fs::remove_file(&path).await {
            error!("Failed to remove temporary file {}: {}", path.display(), e);
        }
        result
    }

    /// Run ffprobe on a file and read `format.duration`
    pub async fn probe_duration(file_path: &str) -> Result<f64> {
        info!("Extracting metadata from file: {}", file_path);

        let output = Command::new("ffprobe")
            .arg("-v")
            .arg("quiet")
            .arg("-print_format")
            .arg("json")
            .arg("-show_format")
            .arg(file_path)
            .output()
            .await?;

        if !output.status.success() {
            error!("ffprobe failed with status: {:?}", output.status);
            return Err(anyhow::anyhow!("ffprobe failed"));
        }

        let ffprobe_data: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        Self::parse_duration(&ffprobe_data)
            .ok_or_else(|| anyhow::anyhow!("ffprobe output has no duration"))
    }

    /// `format.duration` is reported as a decimal string
    fn parse_duration(ffprobe_data: &serde_json::Value) -> Option<f64> {
        let duration = ffprobe_data.get("format")?.get("duration")?;
        duration
            .as_str()
            .and_then(|raw| raw.parse::<f64>().ok())
            .or_else(|| duration.as_f64())
            .filter(|d| d.is_finite() && *d >= 0.0)
    }
}
