//! Health check handler

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Configured AI backend, or "none"
    pub ai_backend: &'static str,
}

/// GET /api/health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let ai_backend = state
        .ai
        .as_ref()
        .map(|client| client.kind().as_str())
        .unwrap_or("none");

    Json(HealthResponse {
        status: "ok",
        ai_backend,
    })
}
