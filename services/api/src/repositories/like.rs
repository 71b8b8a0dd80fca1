//! Like repository

use common::error::{StoreError, StoreResult};
use common::store::{Collection, DocumentStore, Filter};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::models::{Like, LikeSubject, collections::LIKES};

#[derive(Clone)]
pub struct LikeRepository {
    likes: Collection<Like>,
}

impl LikeRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            likes: super::collection(store, LIKES),
        }
    }

    /// Remove the like if present, otherwise add it; returns whether the
    /// subject is liked afterwards
    pub async fn toggle(&self, subject: LikeSubject, liked_by: Uuid) -> StoreResult<bool> {
        let filter = subject
            .filter()
            .and(Filter::eq("likedBy", liked_by.to_string()));

        if self.likes.delete_one(&filter).await?.is_some() {
            return Ok(false);
        }

        match self.likes.insert(&Like::new(subject, liked_by)).await {
            Ok(_) => Ok(true),
            Err(StoreError::Duplicate { .. }) => {
                info!("Concurrent like on {} {} by {}", subject.field(), subject.id(), liked_by);
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn delete_for_subject(&self, subject: LikeSubject) -> StoreResult<u64> {
        self.likes.delete_many(&subject.filter()).await
    }

    /// Remove the likes on any of the given comments
    pub async fn delete_for_comments(&self, comments: &[Uuid]) -> StoreResult<u64> {
        if comments.is_empty() {
            return Ok(0);
        }
        let ids: Vec<Value> = comments.iter().map(|id| id.to_string().into()).collect();
        self.likes.delete_many(&Filter::is_in("comment", ids)).await
    }
}
