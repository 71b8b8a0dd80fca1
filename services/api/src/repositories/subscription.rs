//! Subscription repository

use common::error::{StoreError, StoreResult};
use common::store::{Collection, DocumentStore, Filter};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::models::{Subscription, collections::SUBSCRIPTIONS};

#[derive(Clone)]
pub struct SubscriptionRepository {
    subscriptions: Collection<Subscription>,
}

impl SubscriptionRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            subscriptions: super::collection(store, SUBSCRIPTIONS),
        }
    }

    /// Unsubscribe if subscribed, otherwise subscribe; returns whether the
    /// subscription exists afterwards
    pub async fn toggle(&self, channel: Uuid, subscriber: Uuid) -> StoreResult<bool> {
        let filter = Filter::eq("channel", channel.to_string())
            .and(Filter::eq("subscriber", subscriber.to_string()));

        if self.subscriptions.delete_one(&filter).await?.is_some() {
            return Ok(false);
        }

        match self
            .subscriptions
            .insert(&Subscription::new(channel, subscriber))
            .await
        {
            Ok(_) => Ok(true),
            Err(StoreError::Duplicate { .. }) => {
                info!("Concurrent subscription of {} to {}", subscriber, channel);
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }
}
