//! Tweet repository

use common::error::StoreResult;
use common::store::{Collection, DocumentStore, Filter, Update};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Tweet, collections::TWEETS};

#[derive(Clone)]
pub struct TweetRepository {
    tweets: Collection<Tweet>,
}

impl TweetRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            tweets: super::collection(store, TWEETS),
        }
    }

    pub async fn create(&self, tweet: &Tweet) -> StoreResult<Tweet> {
        self.tweets.insert(tweet).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Tweet>> {
        self.tweets.find_by_id(id).await
    }

    pub async fn update_content(&self, id: Uuid, content: &str) -> StoreResult<Option<Tweet>> {
        self.tweets
            .update_by_id(id, &[Update::set("content", content)])
            .await
    }

    pub async fn delete(&self, id: Uuid) -> StoreResult<Option<Tweet>> {
        self.tweets.delete_one(&Filter::id(id)).await
    }
}
