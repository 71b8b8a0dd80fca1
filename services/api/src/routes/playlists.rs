//! Playlist handlers

use auth::validation::{PLAYLIST_DESCRIPTION_MAX, validate_required, validate_text};
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
    error::{ApiError, ApiResult, FieldErrors, parse_id},
    extract::AppJson,
    middleware::CurrentUser,
    models::Playlist,
    read_models::playlists,
    response::ApiResponse,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct PlaylistRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl PlaylistRequest {
    fn validated(&self) -> ApiResult<(String, String)> {
        let name = self.name.trim();
        let description = self.description.trim();

        let mut errors = FieldErrors::new();
        errors.check("name", validate_required("name", name));
        errors.check(
            "description",
            validate_text("description", description, PLAYLIST_DESCRIPTION_MAX),
        );
        errors.finish()?;
        Ok((name.to_string(), description.to_string()))
    }
}

async fn find_owned_playlist(
    state: &AppState,
    user: &CurrentUser,
    id: Uuid,
    action: &str,
) -> ApiResult<Playlist> {
    let playlist = state
        .repos
        .playlists
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Playlist not found".to_string()))?;
    ensure_owner(
        playlist.owner,
        user,
        &format!("Only the owner can {} this playlist", action),
    )?;
    Ok(playlist)
}

pub async fn create_playlist(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    AppJson(payload): AppJson<PlaylistRequest>,
) -> ApiResult<ApiResponse<Playlist>> {
    let (name, description) = payload.validated()?;
    let playlist = state
        .repos
        .playlists
        .create(&Playlist::new(user.id(), name, description))
        .await?;
    Ok(ApiResponse::created(playlist, "Playlist created successfully"))
}

pub async fn user_playlists(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<ApiResponse<Vec<Document>>> {
    let user_id = parse_id("userId", &user_id)?;
    let playlists = playlists::by_owner(state.store.as_ref(), user_id).await?;
    Ok(ApiResponse::ok(playlists, "User playlists fetched successfully"))
}

pub async fn get_playlist(
    State(state): State<AppState>,
    Path(playlist_id): Path<String>,
) -> ApiResult<ApiResponse<Document>> {
    let playlist_id = parse_id("playlistId", &playlist_id)?;
    let playlist = playlists::detail(state.store.as_ref(), playlist_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Playlist not found".to_string()))?;
    Ok(ApiResponse::ok(playlist, "Playlist details fetched successfully"))
}

pub async fn add_video(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((playlist_id, video_id)): Path<(String, String)>,
) -> ApiResult<ApiResponse<Playlist>> {
    let playlist_id = parse_id("playlistId", &playlist_id)?;
    let video_id = parse_id("videoId", &video_id)?;

    if state.repos.videos.find_by_id(video_id).await?.is_none() {
        return Err(ApiError::NotFound("Video not found".to_string()));
    }
    find_owned_playlist(&state, &user, playlist_id, "add videos to").await?;

    let playlist = state
        .repos
        .playlists
        .add_video(playlist_id, video_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Playlist not found".to_string()))?;
    Ok(ApiResponse::ok(playlist, "Video added to playlist successfully"))
}

pub async fn remove_video(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((playlist_id, video_id)): Path<(String, String)>,
) -> ApiResult<ApiResponse<Playlist>> {
    let playlist_id = parse_id("playlistId", &playlist_id)?;
    let video_id = parse_id("videoId", &video_id)?;
    find_owned_playlist(&state, &user, playlist_id, "remove videos from").await?;

    let playlist = state
        .repos
        .playlists
        .remove_video(playlist_id, video_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Playlist not found".to_string()))?;
    Ok(ApiResponse::ok(
        playlist,
        "Video removed from playlist successfully",
    ))
}

pub async fn update_playlist(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(playlist_id): Path<String>,
    AppJson(payload): AppJson<PlaylistRequest>,
) -> ApiResult<ApiResponse<Playlist>> {
    let playlist_id = parse_id("playlistId", &playlist_id)?;
    let (name, description) = payload.validated()?;
    find_owned_playlist(&state, &user, playlist_id, "edit").await?;

    let playlist = state
        .repos
        .playlists
        .update_details(playlist_id, &name, &description)
        .await?
        .ok_or_else(|| ApiError::NotFound("Playlist not found".to_string()))?;
    Ok(ApiResponse::ok(playlist, "Playlist updated successfully"))
}

pub async fn delete_playlist(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(playlist_id): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let playlist_id = parse_id("playlistId", &playlist_id)?;
    find_owned_playlist(&state, &user, playlist_id, "delete").await?;

    state.repos.playlists.delete(playlist_id).await?;
    Ok(ApiResponse::ok(json!({}), "Playlist deleted successfully"))
}
