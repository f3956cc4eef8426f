//! Health and tool catalog endpoints.

use axum::{response::IntoResponse, Json};
use pixelmill_core::ToolId;

/// Liveness: the process is up and serving.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// The ordered catalog of the 13 tools.
pub async fn tools() -> impl IntoResponse {
    Json(ToolId::catalog())
}
