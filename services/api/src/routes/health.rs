use axum::extract::State;
use serde_json::{Value, json};

use crate::{error::ApiResult, response::ApiResponse, state::AppState};

/// Reports whether the document store answers
pub async fn health_check(State(state): State<AppState>) -> ApiResult<ApiResponse<Value>> {
    if !state.store.health_check().await? {
        return Err(anyhow::anyhow!("Document store is unavailable").into());
    }
    Ok(ApiResponse::ok(json!({"store": "up"}), "Health check passed"))
}
