//! A user's tweets

use common::error::StoreResult;
use common::pipeline::{Expr, Join, Pipeline, Projection, SortDirection, execute};
use common::store::{Document, DocumentStore, Filter};
use uuid::Uuid;

use super::join_user;
use crate::models::collections::{LIKES, TWEETS};

pub async fn by_user(
    store: &dyn DocumentStore,
    user: Uuid,
    viewer: Uuid,
) -> StoreResult<Vec<Document>> {
    let pipeline = Pipeline::new()
        .filter(Filter::eq("owner", user.to_string()))
        .join(join_user("owner", "ownerDetails", &["username", "fullname", "avatar"]))
        .join(Join::new(LIKES, "_id", "tweet", "likeDetails"))
        .derive("likesCount", Expr::Size("likeDetails".into()))
        .derive("ownerDetails", Expr::First("ownerDetails".into()))
        .derive(
            "isLiked",
            Expr::contains("likeDetails.likedBy", viewer.to_string()),
        )
        .sort("createdAt", SortDirection::Descending)
        .project(Projection::new(&[
            "content",
            "ownerDetails",
            "likesCount",
            "createdAt",
            "isLiked",
        ]));

    execute(store, TWEETS, &pipeline).await
}
