//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct Health {
    pub status: String,
    /// Records waiting for the next digest.
    pub pending: usize,
    pub durable: bool,
}

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        pending: state.store.snapshot_size(),
        durable: state.store.log_path().is_some(),
    })
}
