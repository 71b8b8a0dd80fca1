//! Video handlers

use auth::validation::{DESCRIPTION_MAX, TITLE_MAX, validate_text};
use axum::{
    Extension,
    extract::{Path, Query, State},
};
use common::pipeline::Page;
use common::store::{Document, Update};
use media::MediaKind;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use super::{discard_media, ensure_owner};
use crate::{
    error::{ApiError, ApiResult, FieldErrors, parse_id},
    extract::{MultipartForm, PageQuery},
    middleware::CurrentUser,
    models::{LikeSubject, Video},
    read_models::videos::{self, VideoSearch},
    response::ApiResponse,
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoListQuery {
    #[serde(flatten)]
    pub paging: PageQuery,
    pub query: Option<String>,
    pub sort_by: Option<String>,
    pub sort_type: Option<String>,
    pub user_id: Option<String>,
}

async fn find_video(state: &AppState, id: Uuid) -> ApiResult<Video> {
    state
        .repos
        .videos
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))
}

fn validate_details(errors: &mut FieldErrors, title: &str, description: &str) {
    errors.check("title", validate_text("title", title, TITLE_MAX));
    errors.check(
        "description",
        validate_text("description", description, DESCRIPTION_MAX),
    );
}

pub async fn list_videos(
    State(state): State<AppState>,
    Query(params): Query<VideoListQuery>,
) -> ApiResult<ApiResponse<Page<Document>>> {
    let owner = params
        .user_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .map(|id| parse_id("userId", id))
        .transpose()?;

    let search = VideoSearch {
        query: params.query,
        owner,
        sort_by: params.sort_by,
        sort_type: params.sort_type,
    };
    let page = videos::search(state.store.as_ref(), &search, params.paging.request()).await?;

    Ok(ApiResponse::ok(page, "Videos fetched successfully"))
}

pub async fn publish_video(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    mut form: MultipartForm,
) -> ApiResult<ApiResponse<Video>> {
    let title = form.text("title");
    let description = form.text("description");
    let video_file = form.take_file("videoFile");
    let thumbnail = form.take_file("thumbnail");

    let mut errors = FieldErrors::new();
    validate_details(&mut errors, &title, &description);
    if video_file.is_none() {
        errors.push("videoFile", "Video file is required");
    }
    if thumbnail.is_none() {
        errors.push("thumbnail", "Thumbnail is required");
    }
    errors.finish()?;
    let (Some(video_file), Some(thumbnail)) = (video_file, thumbnail) else {
        return Err(ApiError::BadRequest("Video file and thumbnail are required".to_string()));
    };

    let stored_video = state
        .media
        .upload(video_file.into_upload(MediaKind::Video))
        .await?;
    let stored_thumbnail = match state
        .media
        .upload(thumbnail.into_upload(MediaKind::Image))
        .await
    {
        Ok(stored) => stored,
        Err(e) => {
            discard_media(&state, &stored_video.url).await;
            return Err(e.into());
        }
    };

    let video = Video::new(
        user.id(),
        title,
        description,
        stored_video.url,
        stored_thumbnail.url,
        stored_video.duration.unwrap_or(0.0),
    );
    let video = state.repos.videos.create(&video).await?;

    info!("User {} published video {}", user.id(), video.id);
    Ok(ApiResponse::created(video, "Video published successfully"))
}

/// Video detail; counts a view and records it in the viewer's history
pub async fn get_video(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Document>> {
    let id = parse_id("videoId", &id)?;
    let video = videos::detail(state.store.as_ref(), id, user.id())
        .await?
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))?;

    state.repos.videos.increment_views(id).await?;
    state
        .repos
        .users
        .update(
            user.id(),
            &[Update::AddToSet("watchHistory".to_string(), id.to_string().into())],
        )
        .await?;

    Ok(ApiResponse::ok(video, "Video fetched successfully"))
}

pub async fn update_video(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    mut form: MultipartForm,
) -> ApiResult<ApiResponse<Video>> {
    let id = parse_id("videoId", &id)?;
    let video = find_video(&state, id).await?;
    ensure_owner(
        video.owner,
        &user,
        "You can't edit this video as you are not the owner",
    )?;

    let title = form.text("title");
    let description = form.text("description");
    let mut errors = FieldErrors::new();
    validate_details(&mut errors, &title, &description);
    errors.finish()?;

    let mut updates = vec![
        Update::set("title", title),
        Update::set("description", description),
    ];
    let replaced_thumbnail = match form.take_file("thumbnail") {
        Some(file) => {
            let stored = state.media.upload(file.into_upload(MediaKind::Image)).await?;
            updates.push(Update::set("thumbnail", stored.url));
            Some(video.thumbnail.clone())
        }
        None => None,
    };

    let updated = state
        .repos
        .videos
        .update(id, &updates)
        .await?
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))?;

    if let Some(old) = replaced_thumbnail {
        discard_media(&state, &old).await;
    }
    Ok(ApiResponse::ok(updated, "Video updated successfully"))
}

/// Delete a video with its comments, the likes on both, and its media
pub async fn delete_video(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let id = parse_id("videoId", &id)?;
    let video = find_video(&state, id).await?;
    ensure_owner(
        video.owner,
        &user,
        "You can't delete this video as you are not the owner",
    )?;

    let video = state
        .repos
        .videos
        .delete(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))?;

    let comment_ids = state.repos.comments.ids_for_video(id).await?;
    state.repos.likes.delete_for_comments(&comment_ids).await?;
    state.repos.comments.delete_for_video(id).await?;
    state
        .repos
        .likes
        .delete_for_subject(LikeSubject::Video(id))
        .await?;

    discard_media(&state, &video.video_file).await;
    discard_media(&state, &video.thumbnail).await;

    info!("User {} deleted video {}", user.id(), id);
    Ok(ApiResponse::ok(json!({}), "Video deleted successfully"))
}

pub async fn toggle_publish(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let id = parse_id("videoId", &id)?;
    let video = find_video(&state, id).await?;
    ensure_owner(
        video.owner,
        &user,
        "You can't toggle publish status as you are not the owner",
    )?;

    let updated = state
        .repos
        .videos
        .update(id, &[Update::set("isPublished", !video.is_published)])
        .await?
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))?;

    Ok(ApiResponse::ok(
        json!({"isPublished": updated.is_published}),
        "Video publish status updated successfully",
    ))
}
