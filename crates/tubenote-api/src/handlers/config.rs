use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::json;

use crate::state::AppState;

/// Clear the cached store configuration; the next request re-resolves it
/// from the remote source or the local file.
#[utoipa::path(
    post,
    path = "/api/v0/config/reload",
    tag = "system",
    responses((status = 200, description = "Cache cleared"))
)]
#[tracing::instrument(skip(state))]
pub async fn reload(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    state.store_config.clear_cache().await;
    Json(json!({ "status": "cache_cleared" }))
}
