//! Index status and reset endpoints

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::IndexStatus;

/// GET /api/status - Index status
pub async fn status(State(state): State<AppState>) -> Json<IndexStatus> {
    Json(state.assistant().status())
}

/// DELETE /api/index - Clear the searchable index, keep uploads
pub async fn reset_index(State(state): State<AppState>) -> Result<Json<Value>> {
    state.assistant().reset_index().await?;
    Ok(Json(json!({ "message": "Index cleared" })))
}

/// DELETE /api/uploads - Delete uploaded files, keep the index
pub async fn reset_uploads(State(state): State<AppState>) -> Result<Json<Value>> {
    state.assistant().reset_uploads().await?;
    Ok(Json(json!({ "message": "Uploads cleared" })))
}

/// POST /api/reset - Clear index and uploads
pub async fn reset_all(State(state): State<AppState>) -> Result<Json<Value>> {
    state.assistant().reset_all().await?;
    Ok(Json(json!({ "message": "Database cleared successfully" })))
}
