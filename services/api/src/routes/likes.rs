//! Like toggles and liked-content lists

use axum::{
    Extension,
    extract::{Path, State},
};
use common::store::Document;
use serde_json::{Value, json};
use tracing::info;

use crate::{
    error::{ApiError, ApiResult, parse_id},
    middleware::CurrentUser,
    models::LikeSubject,
    read_models::likes,
    response::ApiResponse,
    state::AppState,
};

async fn toggle(
    state: &AppState,
    user: &CurrentUser,
    subject: LikeSubject,
    label: &str,
) -> ApiResult<ApiResponse<Value>> {
    let exists = match subject {
        LikeSubject::Video(id) => state.repos.videos.find_by_id(id).await?.is_some(),
        LikeSubject::Comment(id) => state.repos.comments.find_by_id(id).await?.is_some(),
        LikeSubject::Tweet(id) => state.repos.tweets.find_by_id(id).await?.is_some(),
    };
    if !exists {
        return Err(ApiError::NotFound(format!("{} not found", label)));
    }

    let liked = state.repos.likes.toggle(subject, user.id()).await?;
    let status = if liked { "liked" } else { "unliked" };
    info!("User {} {} {} {}", user.id(), status, subject.field(), subject.id());

    Ok(ApiResponse::ok(
        json!({"isLiked": liked, "status": status}),
        format!("{} {} successfully", label, status),
    ))
}

pub async fn toggle_video_like(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(video_id): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let id = parse_id("videoId", &video_id)?;
    toggle(&state, &user, LikeSubject::Video(id), "Video").await
}

pub async fn toggle_comment_like(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(comment_id): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let id = parse_id("commentId", &comment_id)?;
    toggle(&state, &user, LikeSubject::Comment(id), "Comment").await
}

pub async fn toggle_tweet_like(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(tweet_id): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let id = parse_id("tweetId", &tweet_id)?;
    toggle(&state, &user, LikeSubject::Tweet(id), "Tweet").await
}

pub async fn liked_videos(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<ApiResponse<Vec<Document>>> {
    let videos = likes::liked_videos(state.store.as_ref(), user.id()).await?;
    Ok(ApiResponse::ok(videos, "Liked videos fetched successfully"))
}

pub async fn liked_tweets(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<ApiResponse<Vec<Document>>> {
    let tweets = likes::liked_tweets(state.store.as_ref(), user.id()).await?;
    Ok(ApiResponse::ok(tweets, "Liked tweets fetched successfully"))
}
