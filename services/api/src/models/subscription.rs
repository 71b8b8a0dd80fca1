use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `subscriber` follows `channel`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub channel: Uuid,
    pub subscriber: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(channel: Uuid, subscriber: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            channel,
            subscriber,
            created_at: now,
            updated_at: now,
        }
    }
}
