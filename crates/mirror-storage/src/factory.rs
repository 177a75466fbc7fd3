#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{Storage, StorageBackend, StorageError, StorageResult};
use mirror_core::Config;
use std::sync::Arc;

/// Create a storage backend based on configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend() {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let bucket = config
                .s3_bucket()
                .map(String::from)
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;
            let region = config.s3_region().map(String::from).ok_or_else(|| {
                StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
            })?;
            let endpoint = config.s3_endpoint().map(String::from);

            let storage = S3Storage::new(bucket, region, endpoint).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => Ok(Arc::new(create_local_storage(config).await?)),

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}

/// Create the local backend as its concrete type (the file route needs signature checks).
#[cfg(feature = "storage-local")]
pub async fn create_local_storage(config: &Config) -> StorageResult<LocalStorage> {
    let base_path = config.local_storage_path().ok_or_else(|| {
        StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
    })?;
    let base_url = config.local_storage_base_url().ok_or_else(|| {
        StorageError::ConfigError("LOCAL_STORAGE_BASE_URL not configured".to_string())
    })?;
    let secret = config.local_storage_signing_secret().ok_or_else(|| {
        StorageError::ConfigError("LOCAL_STORAGE_SIGNING_SECRET not configured".to_string())
    })?;

    LocalStorage::new(base_path, base_url.to_string(), secret.as_bytes().to_vec()).await
}
