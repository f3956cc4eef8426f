//! Router assembly.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::handlers;
use crate::state::AppState;

/// Headroom above the upload ceiling for multipart framing and option
/// fields; the validator enforces the exact per-file ceiling.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;

    let api = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/tools", get(handlers::health::tools))
        .route("/{tool}", post(handlers::process::process_tool))
        .with_state(state);

    Router::new().nest("/api", api).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(DefaultBodyLimit::max(body_limit))
            .layer(RequestBodyLimitLayer::new(body_limit))
            .layer(CorsLayer::permissive()),
    )
}
