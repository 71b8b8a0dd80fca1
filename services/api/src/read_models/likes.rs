//! What a user has liked

use common::error::StoreResult;
use common::pipeline::{Expr, Join, Pipeline, Projection, SortDirection, execute};
use common::store::{Document, DocumentStore, Filter};
use serde_json::Value;
use uuid::Uuid;

use super::join_user;
use crate::models::collections::{LIKES, TWEETS, VIDEOS};

fn liked_by(user: Uuid, subject_field: &str) -> Pipeline {
    Pipeline::new()
        .filter(Filter::eq("likedBy", user.to_string()))
        .filter(Filter::Exists(subject_field.to_string(), true))
}

/// Videos liked by `user`, most recently liked first
pub async fn liked_videos(store: &dyn DocumentStore, user: Uuid) -> StoreResult<Vec<Document>> {
    let video = Pipeline::new()
        .join(join_user("owner", "ownerDetails", &["username", "fullname", "avatar"]))
        .unwind("ownerDetails");

    let pipeline = liked_by(user, "video")
        .join(Join::new(VIDEOS, "video", "_id", "likedVideo").pipeline(video))
        .unwind("likedVideo")
        .derive("likedVideo.isLiked", Expr::Literal(Value::Bool(true)))
        .sort("createdAt", SortDirection::Descending)
        .project(
            Projection::new(&[
                "likedVideo._id",
                "likedVideo.videoFile",
                "likedVideo.thumbnail",
                "likedVideo.owner",
                "likedVideo.title",
                "likedVideo.description",
                "likedVideo.views",
                "likedVideo.duration",
                "likedVideo.createdAt",
                "likedVideo.isPublished",
                "likedVideo.isLiked",
                "likedVideo.ownerDetails",
            ])
            .without_id(),
        );

    execute(store, LIKES, &pipeline).await
}

/// Tweets liked by `user`, most recently liked first
pub async fn liked_tweets(store: &dyn DocumentStore, user: Uuid) -> StoreResult<Vec<Document>> {
    let tweet = Pipeline::new()
        .join(join_user("owner", "ownerDetails", &["username", "fullname", "avatar"]))
        .unwind("ownerDetails");

    let pipeline = liked_by(user, "tweet")
        .join(Join::new(TWEETS, "tweet", "_id", "likedTweet").pipeline(tweet))
        .unwind("likedTweet")
        .derive("likedTweet.isLiked", Expr::Literal(Value::Bool(true)))
        .sort("createdAt", SortDirection::Descending)
        .project(
            Projection::new(&[
                "likedTweet._id",
                "likedTweet.content",
                "likedTweet.createdAt",
                "likedTweet.isLiked",
                "likedTweet.ownerDetails",
            ])
            .without_id(),
        );

    execute(store, LIKES, &pipeline).await
}
