//! Application setup and initialization

pub mod routes;
pub mod server;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use mirror_core::{Clock, Config, SystemClock};
use mirror_services::{MirrorCaches, StudentDetailService};
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    crate::telemetry::init_telemetry()?;

    tracing::info!(
        environment = %config.environment(),
        storage_backend = %config.storage_backend(),
        "Configuration loaded and validated successfully"
    );

    let state = build_state(config, Arc::new(SystemClock)).await?;
    let router = routes::setup_routes(state.clone());

    Ok((state, router))
}

/// Storage, caches and services for `config`, reading time from `clock`.
pub async fn build_state(config: Config, clock: Arc<dyn Clock>) -> Result<Arc<AppState>> {
    let storage = storage::setup_storage(&config, clock.clone()).await?;

    let caches = Arc::new(MirrorCaches::from_config(&config, clock.clone()));
    let students = StudentDetailService::from_config(
        &config,
        storage.storage.clone(),
        caches,
        clock,
    )
    .context("Failed to create student detail service")?;

    Ok(Arc::new(AppState {
        config,
        students: Arc::new(students),
        storage: storage.storage,
        #[cfg(feature = "storage-local")]
        local_files: storage.local_files,
    }))
}
