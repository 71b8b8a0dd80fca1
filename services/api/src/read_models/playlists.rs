//! Playlist summaries and details

use common::error::StoreResult;
use common::pipeline::{Expr, Join, Pipeline, Projection, execute};
use common::store::{Document, DocumentStore, Filter};
use uuid::Uuid;

use super::join_user;
use crate::models::collections::{PLAYLISTS, VIDEOS};

/// Every playlist of `owner` with video count and total views
pub async fn by_owner(store: &dyn DocumentStore, owner: Uuid) -> StoreResult<Vec<Document>> {
    let pipeline = Pipeline::new()
        .filter(Filter::eq("owner", owner.to_string()))
        .join(Join::new(VIDEOS, "videos", "_id", "videos"))
        .derive("totalVideos", Expr::Size("videos".into()))
        .derive("totalViews", Expr::Sum("videos.views".into()))
        .project(Projection::new(&[
            "name",
            "description",
            "totalVideos",
            "totalViews",
            "updatedAt",
        ]));

    execute(store, PLAYLISTS, &pipeline).await
}

/// A playlist with its published videos in playlist order
pub async fn detail(store: &dyn DocumentStore, playlist: Uuid) -> StoreResult<Option<Document>> {
    let pipeline = Pipeline::new()
        .filter(Filter::id(playlist))
        .join(
            Join::new(VIDEOS, "videos", "_id", "videos")
                .pipeline(Pipeline::new().filter(Filter::eq("isPublished", true))),
        )
        .join(join_user("owner", "ownerDetails", &["username", "fullname", "avatar"]))
        .derive("totalVideos", Expr::Size("videos".into()))
        .derive("totalViews", Expr::Sum("videos.views".into()))
        .derive("ownerDetails", Expr::First("ownerDetails".into()))
        .project(Projection::new(&[
            "name",
            "description",
            "createdAt",
            "updatedAt",
            "totalVideos",
            "totalViews",
            "videos._id",
            "videos.videoFile",
            "videos.thumbnail",
            "videos.title",
            "videos.description",
            "videos.duration",
            "videos.createdAt",
            "videos.views",
            "ownerDetails",
        ]));

    Ok(execute(store, PLAYLISTS, &pipeline).await?.into_iter().next())
}
