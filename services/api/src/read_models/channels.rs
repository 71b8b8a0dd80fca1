//! Channel profiles and watch history

use common::error::StoreResult;
use common::pipeline::{Expr, Join, Pipeline, Projection, execute};
use common::store::{Document, DocumentStore, Filter};
use serde_json::Value;
use uuid::Uuid;

use super::join_user;
use crate::models::collections::{SUBSCRIPTIONS, USERS, VIDEOS};

/// Public profile of the channel named `username`, as seen by `viewer`
pub async fn profile(
    store: &dyn DocumentStore,
    username: &str,
    viewer: Uuid,
) -> StoreResult<Option<Document>> {
    let pipeline = Pipeline::new()
        .filter(Filter::eq("username", username))
        .join(Join::new(SUBSCRIPTIONS, "_id", "channel", "subscribers"))
        .join(Join::new(SUBSCRIPTIONS, "_id", "subscriber", "subscribedTo"))
        .derive("subscribersCount", Expr::Size("subscribers".into()))
        .derive("channelsSubscribedToCount", Expr::Size("subscribedTo".into()))
        .derive(
            "isSubscribed",
            Expr::contains("subscribers.subscriber", viewer.to_string()),
        )
        .project(Projection::new(&[
            "fullname",
            "username",
            "email",
            "avatar",
            "coverImage",
            "subscribersCount",
            "channelsSubscribedToCount",
            "isSubscribed",
        ]));

    Ok(execute(store, USERS, &pipeline).await?.into_iter().next())
}

/// Videos in `user`'s watch history, in the order they were first watched
pub async fn watch_history(store: &dyn DocumentStore, user: Uuid) -> StoreResult<Vec<Value>> {
    let video = Pipeline::new()
        .join(join_user("owner", "owner", &["fullname", "username", "avatar"]))
        .derive("owner", Expr::First("owner".into()));

    let pipeline = Pipeline::new()
        .filter(Filter::id(user))
        .join(Join::new(VIDEOS, "watchHistory", "_id", "watchHistory").pipeline(video))
        .project(Projection::new(&["watchHistory"]));

    let history = execute(store, USERS, &pipeline)
        .await?
        .into_iter()
        .next()
        .and_then(|mut doc| doc.remove("watchHistory"));

    Ok(match history {
        Some(Value::Array(videos)) => videos,
        _ => Vec::new(),
    })
}
