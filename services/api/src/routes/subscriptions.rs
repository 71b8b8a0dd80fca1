//! Subscription handlers

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
    read_models::subscriptions,
    response::ApiResponse,
    state::AppState,
};

pub async fn toggle_subscription(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(channel_id): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let channel_id = parse_id("channelId", &channel_id)?;
    if state.repos.users.find_by_id(channel_id).await?.is_none() {
        return Err(ApiError::NotFound("Channel not found".to_string()));
    }

    let subscribed = state
        .repos
        .subscriptions
        .toggle(channel_id, user.id())
        .await?;
    let status = if subscribed { "subscribed" } else { "unsubscribed" };
    info!("User {} {} to channel {}", user.id(), status, channel_id);

    Ok(ApiResponse::ok(
        json!({"subscribed": subscribed, "status": status}),
        format!("Channel {} successfully", status),
    ))
}

pub async fn channel_subscribers(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> ApiResult<ApiResponse<Vec<Document>>> {
    let channel_id = parse_id("channelId", &channel_id)?;
    let subscribers = subscriptions::subscribers(state.store.as_ref(), channel_id).await?;
    Ok(ApiResponse::ok(
        subscribers,
        "Channel subscribers fetched successfully",
    ))
}

pub async fn subscribed_channels(
    State(state): State<AppState>,
    Path(subscriber_id): Path<String>,
) -> ApiResult<ApiResponse<Vec<Document>>> {
    let subscriber_id = parse_id("subscriberId", &subscriber_id)?;
    let channels = subscriptions::subscribed_channels(state.store.as_ref(), subscriber_id).await?;
    Ok(ApiResponse::ok(
        channels,
        "Subscribed channels fetched successfully",
    ))
}
