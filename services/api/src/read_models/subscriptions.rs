//! Subscriber and subscription lists

use common::error::StoreResult;
use common::pipeline::{Expr, Join, Pipeline, Projection, SortDirection, execute};
use common::store::{Document, DocumentStore, Filter};
use uuid::Uuid;

use crate::models::collections::{SUBSCRIPTIONS, USERS, VIDEOS};

/// Users subscribed to `channel`, each with their own subscriber count and
/// whether `channel` subscribes back
pub async fn subscribers(store: &dyn DocumentStore, channel: Uuid) -> StoreResult<Vec<Document>> {
    let subscriber = Pipeline::new()
        .join(Join::new(SUBSCRIPTIONS, "_id", "channel", "subscribers"))
        .derive(
            "subscribedToSubscriber",
            Expr::contains("subscribers.subscriber", channel.to_string()),
        )
        .derive("subscribersCount", Expr::Size("subscribers".into()));

    let pipeline = Pipeline::new()
        .filter(Filter::eq("channel", channel.to_string()))
        .join(Join::new(USERS, "subscriber", "_id", "subscriber").pipeline(subscriber))
        .unwind("subscriber")
        .project(
            Projection::new(&[
                "subscriber._id",
                "subscriber.username",
                "subscriber.fullname",
                "subscriber.avatar",
                "subscriber.subscribedToSubscriber",
                "subscriber.subscribersCount",
            ])
            .without_id(),
        );

    execute(store, SUBSCRIPTIONS, &pipeline).await
}

/// Channels `subscriber` follows, each with its latest video
pub async fn subscribed_channels(
    store: &dyn DocumentStore,
    subscriber: Uuid,
) -> StoreResult<Vec<Document>> {
    let channel = Pipeline::new()
        .join(
            Join::new(VIDEOS, "_id", "owner", "videos")
                .pipeline(Pipeline::new().sort("createdAt", SortDirection::Ascending)),
        )
        .derive("latestVideo", Expr::Last("videos".into()));

    let pipeline = Pipeline::new()
        .filter(Filter::eq("subscriber", subscriber.to_string()))
        .join(Join::new(USERS, "channel", "_id", "subscribedChannel").pipeline(channel))
        .unwind("subscribedChannel")
        .project(
            Projection::new(&[
                "subscribedChannel._id",
                "subscribedChannel.username",
                "subscribedChannel.fullname",
                "subscribedChannel.avatar",
                "subscribedChannel.latestVideo._id",
                "subscribedChannel.latestVideo.videoFile",
                "subscribedChannel.latestVideo.thumbnail",
                "subscribedChannel.latestVideo.owner",
                "subscribedChannel.latestVideo.title",
                "subscribedChannel.latestVideo.description",
                "subscribedChannel.latestVideo.duration",
                "subscribedChannel.latestVideo.createdAt",
                "subscribedChannel.latestVideo.views",
            ])
            .without_id(),
        );

    execute(store, SUBSCRIPTIONS, &pipeline).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::store::MemoryStore;
    use serde_json::{Value, json};

    async fn seed(store: &MemoryStore, collection: &str, value: Value) {
        let doc = value.as_object().cloned().unwrap_or_default();
        store.insert(collection, doc).await.unwrap();
    }

    #[tokio::test]
    async fn test_subscriber_lists() {
        let store = MemoryStore::new();
        let (alice, bobby) = (Uuid::new_v4(), Uuid::new_v4());
        seed(&store, USERS, json!({"_id": alice.to_string(), "username": "alice1", "password": "h"})).await;
        seed(&store, USERS, json!({"_id": bobby.to_string(), "username": "bobby1", "password": "h"})).await;
        // bobby follows alice, alice follows bobby back
        seed(&store, SUBSCRIPTIONS, json!({"channel": alice.to_string(), "subscriber": bobby.to_string()})).await;
        seed(&store, SUBSCRIPTIONS, json!({"channel": bobby.to_string(), "subscriber": alice.to_string()})).await;
        seed(&store, VIDEOS, json!({"title": "old", "owner": alice.to_string(), "createdAt": "2024-01-01T00:00:00Z"})).await;
        seed(&store, VIDEOS, json!({"title": "new", "owner": alice.to_string(), "createdAt": "2024-05-01T00:00:00Z"})).await;

        let docs = subscribers(&store, alice).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["subscriber"]["username"], json!("bobby1"));
        assert_eq!(docs[0]["subscriber"]["subscribedToSubscriber"], json!(true));
        assert_eq!(docs[0]["subscriber"]["subscribersCount"], json!(1));
        assert!(docs[0]["subscriber"].get("password").is_none());

        let docs = subscribed_channels(&store, bobby).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["subscribedChannel"]["username"], json!("alice1"));
        assert_eq!(docs[0]["subscribedChannel"]["latestVideo"]["title"], json!("new"));
    }
}
