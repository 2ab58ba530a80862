//! Route handlers for the digest server.

pub mod health;
pub mod webhook;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Thumbnails arrive inline with the webhook, so allow more than axum's 2 MB default.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Build the router with all routes.
pub fn router(webhook_path: &str) -> Router<AppState> {
    Router::new()
        .route(webhook_path, post(webhook::receive))
        .route("/health", get(health::health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}
