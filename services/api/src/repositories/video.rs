//! Video repository

use common::error::StoreResult;
use common::store::{Collection, DocumentStore, Filter, Update};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Video, collections::VIDEOS};

#[derive(Clone)]
pub struct VideoRepository {
    videos: Collection<Video>,
}

impl VideoRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            videos: super::collection(store, VIDEOS),
        }
    }

    pub async fn create(&self, video: &Video) -> StoreResult<Video> {
        self.videos.insert(video).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Video>> {
        self.videos.find_by_id(id).await
    }

    pub async fn update(&self, id: Uuid, updates: &[Update]) -> StoreResult<Option<Video>> {
        self.videos.update_by_id(id, updates).await
    }

    pub async fn increment_views(&self, id: Uuid) -> StoreResult<Option<Video>> {
        self.videos
            .update_by_id(id, &[Update::Inc("views".to_string(), 1)])
            .await
    }

    pub async fn delete(&self, id: Uuid) -> StoreResult<Option<Video>> {
        self.videos.delete_one(&Filter::id(id)).await
    }

    pub async fn find_by_owner(&self, owner: Uuid) -> StoreResult<Vec<Video>> {
        self.videos
            .find(&Filter::eq("owner", owner.to_string()))
            .await
    }
}
