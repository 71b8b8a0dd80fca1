use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn published_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    /// Seconds
    pub duration: f64,
    #[serde(default)]
    pub views: i64,
    #[serde(default = "published_by_default")]
    pub is_published: bool,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    pub fn new(
        owner: Uuid,
        title: String,
        description: String,
        video_file: String,
        thumbnail: String,
        duration: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            video_file,
            thumbnail,
            title,
            description,
            duration,
            views: 0,
            is_published: true,
            owner,
            created_at: now,
            updated_at: now,
        }
    }
}
