//! Creator dashboard

use common::error::StoreResult;
use common::pipeline::{Expr, Join, Pipeline, Projection, SortDirection, execute};
use common::store::{Document, DocumentStore, Filter};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::models::collections::{
    COMMENTS, LIKES, PLAYLISTS, SUBSCRIPTIONS, TWEETS, VIDEOS,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStats {
    pub total_videos: u64,
    pub total_views: i64,
    /// Likes across all of the channel's videos
    pub total_likes: u64,
    pub total_comments: u64,
    pub total_playlists: u64,
    pub total_subscribers: u64,
    pub total_tweets: u64,
}

fn owned_videos(owner: Uuid) -> Pipeline {
    Pipeline::new()
        .filter(Filter::eq("owner", owner.to_string()))
        .join(Join::new(LIKES, "_id", "video", "likes"))
        .join(Join::new(COMMENTS, "_id", "video", "comments"))
        .derive("likesCount", Expr::Size("likes".into()))
        .derive("commentsCount", Expr::Size("comments".into()))
}

pub async fn stats(store: &dyn DocumentStore, owner: Uuid) -> StoreResult<ChannelStats> {
    let pipeline = owned_videos(owner).project(Projection::new(&[
        "views",
        "likesCount",
        "commentsCount",
    ]));
    let videos = execute(store, VIDEOS, &pipeline).await?;

    let field = |doc: &Document, name: &str| doc.get(name).and_then(Value::as_i64).unwrap_or(0);
    let owner_filter = Filter::eq("owner", owner.to_string());

    Ok(ChannelStats {
        total_videos: videos.len() as u64,
        total_views: videos.iter().map(|v| field(v, "views")).sum(),
        total_likes: videos.iter().map(|v| field(v, "likesCount") as u64).sum(),
        total_comments: videos.iter().map(|v| field(v, "commentsCount") as u64).sum(),
        total_playlists: store.count(PLAYLISTS, &owner_filter).await?,
        total_subscribers: store
            .count(SUBSCRIPTIONS, &Filter::eq("channel", owner.to_string()))
            .await?,
        total_tweets: store.count(TWEETS, &owner_filter).await?,
    })
}

/// Every video of the channel, published or not, newest first
pub async fn videos(store: &dyn DocumentStore, owner: Uuid) -> StoreResult<Vec<Document>> {
    let pipeline = owned_videos(owner)
        .sort("createdAt", SortDirection::Descending)
        .derive("createdAt", Expr::DateParts("createdAt".into()))
        .project(Projection::new(&[
            "videoFile",
            "thumbnail",
            "title",
            "description",
            "createdAt.year",
            "createdAt.month",
            "createdAt.day",
            "isPublished",
            "likesCount",
            "commentsCount",
        ]));

    execute(store, VIDEOS, &pipeline).await
}
