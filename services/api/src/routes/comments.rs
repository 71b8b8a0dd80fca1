//! Comment handlers

use auth::validation::{COMMENT_MAX, validate_text};
use axum::{
    Extension,
    extract::{Path, Query, State},
};
use common::pipeline::Page;
use common::store::Document;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use super::ensure_owner;
use crate::{
    error::{ApiError, ApiResult, parse_id},
    extract::{AppJson, PageQuery},
    middleware::CurrentUser,
    models::{Comment, LikeSubject},
    read_models::comments,
    response::ApiResponse,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub content: String,
}

impl CommentRequest {
    fn content(&self) -> ApiResult<String> {
        let content = self.content.trim();
        validate_text("content", content, COMMENT_MAX)
            .map_err(|message| ApiError::invalid("content", message))?;
        Ok(content.to_string())
    }
}

async fn ensure_video_exists(state: &AppState, id: Uuid) -> ApiResult<()> {
    state
        .repos
        .videos
        .find_by_id(id)
        .await?
        .map(|_| ())
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))
}

async fn find_comment(state: &AppState, id: Uuid) -> ApiResult<Comment> {
    state
        .repos
        .comments
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(video_id): Path<String>,
    Query(paging): Query<PageQuery>,
) -> ApiResult<ApiResponse<Page<Document>>> {
    let video_id = parse_id("videoId", &video_id)?;
    ensure_video_exists(&state, video_id).await?;

    let page =
        comments::for_video(state.store.as_ref(), video_id, user.id(), paging.request()).await?;
    Ok(ApiResponse::ok(page, "Comments fetched successfully"))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(video_id): Path<String>,
    AppJson(payload): AppJson<CommentRequest>,
) -> ApiResult<ApiResponse<Comment>> {
    let video_id = parse_id("videoId", &video_id)?;
    let content = payload.content()?;
    ensure_video_exists(&state, video_id).await?;

    let comment = state
        .repos
        .comments
        .create(&Comment::new(video_id, user.id(), content))
        .await?;
    Ok(ApiResponse::created(comment, "Comment added successfully"))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(comment_id): Path<String>,
    AppJson(payload): AppJson<CommentRequest>,
) -> ApiResult<ApiResponse<Comment>> {
    let comment_id = parse_id("commentId", &comment_id)?;
    let content = payload.content()?;
    let comment = find_comment(&state, comment_id).await?;
    ensure_owner(comment.owner, &user, "Only the comment owner can edit the comment")?;

    let updated = state
        .repos
        .comments
        .update_content(comment_id, &content)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;
    Ok(ApiResponse::ok(updated, "Comment updated successfully"))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(comment_id): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let comment_id = parse_id("commentId", &comment_id)?;
    let comment = find_comment(&state, comment_id).await?;
    ensure_owner(comment.owner, &user, "Only the comment owner can delete the comment")?;

    state.repos.comments.delete(comment_id).await?;
    state
        .repos
        .likes
        .delete_for_subject(LikeSubject::Comment(comment_id))
        .await?;

    Ok(ApiResponse::ok(
        json!({"commentId": comment_id}),
        "Comment deleted successfully",
    ))
}
