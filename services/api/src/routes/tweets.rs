//! Tweet handlers

use auth::validation::{TWEET_MAX, validate_text};
use axum::{
    Extension,
    extract::{Path, State},
};
use common::store::Document;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use super::ensure_owner;
use crate::{
    error::{ApiError, ApiResult, parse_id},
    extract::AppJson,
    middleware::CurrentUser,
    models::{LikeSubject, Tweet},
    read_models::tweets,
    response::ApiResponse,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct TweetRequest {
    #[serde(default)]
    pub content: String,
}

impl TweetRequest {
    fn content(&self) -> ApiResult<String> {
        let content = self.content.trim();
        validate_text("content", content, TWEET_MAX)
            .map_err(|message| ApiError::invalid("content", message))?;
        Ok(content.to_string())
    }
}

async fn find_tweet(state: &AppState, id: Uuid) -> ApiResult<Tweet> {
    state
        .repos
        .tweets
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tweet not found".to_string()))
}

pub async fn create_tweet(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    AppJson(payload): AppJson<TweetRequest>,
) -> ApiResult<ApiResponse<Tweet>> {
    let content = payload.content()?;
    let tweet = state
        .repos
        .tweets
        .create(&Tweet::new(user.id(), content))
        .await?;
    Ok(ApiResponse::created(tweet, "Tweet created successfully"))
}

pub async fn user_tweets(
    State(state): State<AppState>,
    Extension(viewer): Extension<CurrentUser>,
    Path(user_id): Path<String>,
) -> ApiResult<ApiResponse<Vec<Document>>> {
    let user_id = parse_id("userId", &user_id)?;
    if state.repos.users.find_by_id(user_id).await?.is_none() {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let tweets = tweets::by_user(state.store.as_ref(), user_id, viewer.id()).await?;
    Ok(ApiResponse::ok(tweets, "User tweets fetched successfully"))
}

pub async fn update_tweet(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(tweet_id): Path<String>,
    AppJson(payload): AppJson<TweetRequest>,
) -> ApiResult<ApiResponse<Tweet>> {
    let tweet_id = parse_id("tweetId", &tweet_id)?;
    let content = payload.content()?;
    let tweet = find_tweet(&state, tweet_id).await?;
    ensure_owner(tweet.owner, &user, "Only the owner can edit their tweet")?;

    let updated = state
        .repos
        .tweets
        .update_content(tweet_id, &content)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tweet not found".to_string()))?;
    Ok(ApiResponse::ok(updated, "Tweet updated successfully"))
}

pub async fn delete_tweet(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(tweet_id): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let tweet_id = parse_id("tweetId", &tweet_id)?;
    let tweet = find_tweet(&state, tweet_id).await?;
    ensure_owner(tweet.owner, &user, "Only the owner can delete their tweet")?;

    state.repos.tweets.delete(tweet_id).await?;
    state
        .repos
        .likes
        .delete_for_subject(LikeSubject::Tweet(tweet_id))
        .await?;

    Ok(ApiResponse::ok(
        json!({"tweetId": tweet_id}),
        "Tweet deleted successfully",
    ))
}
