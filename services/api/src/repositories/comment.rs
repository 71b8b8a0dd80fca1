//! Comment repository

use common::error::StoreResult;
use common::store::{Collection, DocumentStore, Filter, Update};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Comment, collections::COMMENTS};

#[derive(Clone)]
pub struct CommentRepository {
    comments: Collection<Comment>,
}

impl CommentRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            comments: super::collection(store, COMMENTS),
        }
    }

    pub async fn create(&self, comment: &Comment) -> StoreResult<Comment> {
        self.comments.insert(comment).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        self.comments.find_by_id(id).await
    }

    pub async fn update_content(&self, id: Uuid, content: &str) -> StoreResult<Option<Comment>> {
        self.comments
            .update_by_id(id, &[Update::set("content", content)])
            .await
    }

    pub async fn delete(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        self.comments.delete_one(&Filter::id(id)).await
    }

    /// Ids of every comment on a video
    pub async fn ids_for_video(&self, video: Uuid) -> StoreResult<Vec<Uuid>> {
        let comments = self
            .comments
            .find(&Filter::eq("video", video.to_string()))
            .await?;
        Ok(comments.into_iter().map(|c| c.id).collect())
    }

    pub async fn delete_for_video(&self, video: Uuid) -> StoreResult<u64> {
        self.comments
            .delete_many(&Filter::eq("video", video.to_string()))
            .await
    }
}
