//! API service routes
//!
//! Everything lives under `/api/v1`. Account bootstrap routes are public,
//! two of them behind the rate limiter; every other route requires an
//! access token.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, patch, post},
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::{CurrentUser, auth_middleware, rate_limit_middleware},
    state::AppState,
};

pub mod comments;
pub mod dashboard;
pub mod health;
pub mod likes;
pub mod playlists;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let rate_limited_routes = Router::new()
        .route("/users/resend-verification", patch(users::resend_verification))
        .route("/users/forgot-password", patch(users::forgot_password))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    let public_routes = Router::new()
        .route("/healthCheck", get(health::health_check))
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
        .route("/users/verify-email/:token", get(users::verify_email))
        .route("/users/reset-password/:token", patch(users::reset_password))
        .route(
            "/users/refresh-token",
            get(users::refresh_access_token).post(users::refresh_access_token),
        );

    let protected_routes = Router::new()
        .route("/users/current-user", get(users::current_user))
        .route("/users/channel-profile/:username", get(users::channel_profile))
        .route("/users/watch-history", get(users::watch_history))
        .route("/users/change-password", patch(users::change_password))
        .route("/users/update-avatar", patch(users::update_avatar))
        .route("/users/update-cover", patch(users::update_cover_image))
        .route("/users/update-account", patch(users::update_account))
        .route("/users/logout", get(users::logout))
        .route("/videos", get(videos::list_videos))
        .route("/videos/create-new", post(videos::publish_video))
        .route("/videos/v/:id", get(videos::get_video))
        .route("/videos/update/:id", patch(videos::update_video))
        .route("/videos/delete/:id", axum::routing::delete(videos::delete_video))
        .route("/videos/toggle-publish/:id", get(videos::toggle_publish))
        .route(
            "/comments/:videoId",
            get(comments::list_comments).post(comments::add_comment),
        )
        .route(
            "/comments/c/:commentId",
            patch(comments::update_comment).delete(comments::delete_comment),
        )
        .route("/likes/v/:videoId", post(likes::toggle_video_like))
        .route("/likes/c/:commentId", post(likes::toggle_comment_like))
        .route("/likes/t/:tweetId", post(likes::toggle_tweet_like))
        .route("/likes/videos", get(likes::liked_videos))
        .route("/likes/tweets", get(likes::liked_tweets))
        .route("/tweets", post(tweets::create_tweet))
        .route("/tweets/user/:userId", get(tweets::user_tweets))
        .route(
            "/tweets/:tweetId",
            patch(tweets::update_tweet).delete(tweets::delete_tweet),
        )
        .route("/playlists", post(playlists::create_playlist))
        .route(
            "/playlists/:playlistId",
            get(playlists::get_playlist)
                .patch(playlists::update_playlist)
                .delete(playlists::delete_playlist),
        )
        .route(
            "/playlists/add/:playlistId/:videoId",
            post(playlists::add_video),
        )
        .route(
            "/playlists/remove/:playlistId/:videoId",
            post(playlists::remove_video),
        )
        .route("/playlists/user/:userId", get(playlists::user_playlists))
        .route(
            "/subscriptions/c/:channelId",
            get(subscriptions::channel_subscribers).post(subscriptions::toggle_subscription),
        )
        .route(
            "/subscriptions/u/:subscriberId",
            get(subscriptions::subscribed_channels),
        )
        .route("/dashboard/stats", get(dashboard::channel_stats))
        .route("/dashboard/videos", get(dashboard::channel_videos))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api = Router::new()
        .merge(public_routes)
        .merge(rate_limited_routes)
        .merge(protected_routes);

    Router::new()
        .nest("/api/v1", api)
        .layer(DefaultBodyLimit::max(state.config.upload_limit_bytes))
        .layer(cors_layer(&state.config.cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Credentialed CORS for the configured origin; `*` mirrors the caller
fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin.trim() == "*" {
        AllowOrigin::mirror_request()
    } else {
        match HeaderValue::from_str(origin.trim()) {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                warn!("Invalid CORS_ORIGIN {:?}, mirroring request origin", origin);
                AllowOrigin::mirror_request()
            }
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// 403 unless the current user owns the resource
pub(crate) fn ensure_owner(owner: Uuid, user: &CurrentUser, message: &str) -> ApiResult<()> {
    if owner != user.id() {
        warn!("User {} denied access to a resource owned by {}", user.id(), owner);
        return Err(ApiError::Forbidden(message.to_string()));
    }
    Ok(())
}

/// Delete a media object, logging instead of failing
pub(crate) async fn discard_media(state: &AppState, url: &str) {
    match state.media.remove(url).await {
        Ok(()) => info!("Removed media {}", url),
        Err(e) => warn!("Failed to remove media {}: {}", url, e),
    }
}
