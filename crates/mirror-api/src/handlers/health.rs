use crate::state::AppState;
use axum::{extract::State, Json};
use mirror_core::StorageBackend;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub storage_backend: StorageBackend,
}

/// Liveness probe reporting the active storage backend.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        storage_backend: state.storage.backend_type(),
    })
}
