//! Video listings and the video detail view

use common::error::StoreResult;
use common::pipeline::{
    Expr, Join, Page, PageRequest, Pipeline, Projection, SortDirection, execute, execute_paged,
};
use common::store::{Document, DocumentStore, Filter};
use uuid::Uuid;

use super::join_user;
use crate::models::collections::{LIKES, SUBSCRIPTIONS, USERS, VIDEOS};

/// Parameters of `GET /videos`
#[derive(Debug, Clone, Default)]
pub struct VideoSearch {
    pub query: Option<String>,
    pub owner: Option<Uuid>,
    pub sort_by: Option<String>,
    pub sort_type: Option<String>,
}

impl VideoSearch {
    fn pipeline(&self) -> Pipeline {
        let mut pipeline = Pipeline::new();
        if let Some(query) = self.query.as_deref().filter(|q| !q.trim().is_empty()) {
            pipeline = pipeline.search(&["title", "description"], query.trim());
        }
        if let Some(owner) = self.owner {
            pipeline = pipeline.filter(Filter::eq("owner", owner.to_string()));
        }
        pipeline = pipeline.filter(Filter::eq("isPublished", true));

        pipeline = match (self.sort_by.as_deref(), self.sort_type.as_deref()) {
            (Some(field), Some(direction)) if !field.trim().is_empty() => {
                pipeline.sort(field.trim(), SortDirection::parse(direction))
            }
            _ => pipeline.sort("createdAt", SortDirection::Descending),
        };

        pipeline
            .join(join_user("owner", "ownerDetails", &["username", "avatar"]))
            .derive("ownerDetails", Expr::First("ownerDetails".into()))
    }
}

/// Published videos matching the search, one page at a time
pub async fn search(
    store: &dyn DocumentStore,
    search: &VideoSearch,
    page: PageRequest,
) -> StoreResult<Page<Document>> {
    execute_paged(store, VIDEOS, &search.pipeline(), page).await
}

/// A video with its owner's channel summary and like state for `viewer`
pub async fn detail(
    store: &dyn DocumentStore,
    video_id: Uuid,
    viewer: Uuid,
) -> StoreResult<Option<Document>> {
    let viewer = viewer.to_string();
    let owner = Pipeline::new()
        .join(Join::new(SUBSCRIPTIONS, "_id", "channel", "subscribers"))
        .derive("subscribersCount", Expr::Size("subscribers".into()))
        .derive(
            "isSubscribed",
            Expr::contains("subscribers.subscriber", viewer.clone()),
        )
        .project(Projection::new(&[
            "username",
            "avatar",
            "subscribersCount",
            "isSubscribed",
        ]));

    let pipeline = Pipeline::new()
        .filter(Filter::id(video_id))
        .join(Join::new(LIKES, "_id", "video", "likes"))
        .join(Join::new(USERS, "owner", "_id", "owner").pipeline(owner))
        .derive("likesCount", Expr::Size("likes".into()))
        .derive("owner", Expr::First("owner".into()))
        .derive("isLiked", Expr::contains("likes.likedBy", viewer))
        .project(Projection::new(&[
            "videoFile",
            "thumbnail",
            "title",
            "description",
            "views",
            "createdAt",
            "duration",
            "isPublished",
            "owner",
            "likesCount",
            "isLiked",
        ]));

    Ok(execute(store, VIDEOS, &pipeline).await?.into_iter().next())
}
