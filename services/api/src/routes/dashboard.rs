//! Creator dashboard handlers

use axum::{Extension, extract::State};
use common::store::Document;

use crate::{
    error::ApiResult,
    middleware::CurrentUser,
    read_models::dashboard::{self, ChannelStats},
    response::ApiResponse,
    state::AppState,
};

pub async fn channel_stats(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<ApiResponse<ChannelStats>> {
    let stats = dashboard::stats(state.store.as_ref(), user.id()).await?;
    Ok(ApiResponse::ok(stats, "Channel stats fetched successfully"))
}

pub async fn channel_videos(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<ApiResponse<Vec<Document>>> {
    let videos = dashboard::videos(state.store.as_ref(), user.id()).await?;
    Ok(ApiResponse::ok(videos, "Channel videos fetched successfully"))
}
