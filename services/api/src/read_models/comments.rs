//! Comments under a video

use common::error::StoreResult;
use common::pipeline::{
    Expr, Join, Page, PageRequest, Pipeline, Projection, SortDirection, execute_paged,
};
use common::store::{Document, DocumentStore, Filter};
use uuid::Uuid;

use super::join_user;
use crate::models::collections::{COMMENTS, LIKES};

/// Newest first, each with its author, like count and the viewer's like
pub async fn for_video(
    store: &dyn DocumentStore,
    video_id: Uuid,
    viewer: Uuid,
    page: PageRequest,
) -> StoreResult<Page<Document>> {
    let pipeline = Pipeline::new()
        .filter(Filter::eq("video", video_id.to_string()))
        .sort("createdAt", SortDirection::Descending)
        .join(join_user("owner", "owner", &["username", "fullname", "avatar"]))
        .join(Join::new(LIKES, "_id", "comment", "likes"))
        .derive("likesCount", Expr::Size("likes".into()))
        .derive("owner", Expr::First("owner".into()))
        .derive("isLiked", Expr::contains("likes.likedBy", viewer.to_string()))
        .project(Projection::new(&[
            "content",
            "createdAt",
            "updatedAt",
            "likesCount",
            "owner",
            "isLiked",
        ]));

    execute_paged(store, COMMENTS, &pipeline, page).await
}
