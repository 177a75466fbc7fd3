//! Storage backend setup

use anyhow::{Context, Result};
use mirror_core::{Clock, Config, StorageBackend};
#[cfg(feature = "storage-local")]
use mirror_storage::{factory::create_local_storage, LocalStorage};
use mirror_storage::{create_storage, Storage};
use std::sync::Arc;

pub struct StorageSetup {
    pub storage: Arc<dyn Storage>,
    #[cfg(feature = "storage-local")]
    pub local_files: Option<LocalStorage>,
}

/// Create the configured backend. The local backend also signs its temporary
/// URLs with `clock`.
#[cfg_attr(not(feature = "storage-local"), allow(unused_variables))]
pub async fn setup_storage(config: &Config, clock: Arc<dyn Clock>) -> Result<StorageSetup> {
    match config.storage_backend() {
        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let local = create_local_storage(config)
                .await
                .context("Failed to initialize local storage")?
                .with_clock(clock);
            tracing::info!(
                path = config.local_storage_path().unwrap_or_default(),
                "Local storage initialized"
            );
            Ok(StorageSetup {
                storage: Arc::new(local.clone()),
                local_files: Some(local),
            })
        }
        _ => {
            let storage = create_storage(config)
                .await
                .context("Failed to initialize storage")?;
            tracing::info!(backend = %storage.backend_type(), "Storage initialized");
            Ok(StorageSetup {
                storage,
                #[cfg(feature = "storage-local")]
                local_files: None,
            })
        }
    }
}
