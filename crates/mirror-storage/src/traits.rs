//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use mirror_core::AppError;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(id) => AppError::NotFound(format!("Object not found: {}", id)),
            StorageError::ConfigError(msg) => AppError::Configuration(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// One entry of a temporary URL issuance batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporaryUrlRequest {
    pub object_id: String,
    pub max_age: Duration,
}

/// A temporary URL issued for an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporaryUrl {
    pub object_id: String,
    pub url: String,
}

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) must implement this trait.
/// Methods taking an `object_id` expect an identifier previously returned by
/// [`Storage::upload_with_key`] (or recognised by [`Storage::is_managed_reference`]).
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload data to a specific storage key and return its object identifier.
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<String>;

    /// Download an object by its identifier
    async fn download(&self, object_id: &str) -> StorageResult<Vec<u8>>;

    /// Check if an object exists
    async fn exists(&self, object_id: &str) -> StorageResult<bool>;

    /// Generate a presigned/temporary GET URL for one object
    async fn get_presigned_url(
        &self,
        object_id: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Issue temporary URLs for a batch of objects in one call.
    ///
    /// Entries that cannot be signed are logged and left out of the response;
    /// callers match results by `object_id`.
    async fn issue_temporary_urls(
        &self,
        requests: &[TemporaryUrlRequest],
    ) -> StorageResult<Vec<TemporaryUrl>> {
        let mut issued = Vec::with_capacity(requests.len());
        for request in requests {
            match self
                .get_presigned_url(&request.object_id, request.max_age)
                .await
            {
                Ok(url) => issued.push(TemporaryUrl {
                    object_id: request.object_id.clone(),
                    url,
                }),
                Err(e) => {
                    tracing::warn!(
                        object_id = %request.object_id,
                        error = %e,
                        "Failed to issue temporary URL"
                    );
                }
            }
        }
        Ok(issued)
    }

    /// Prefix shared by every object identifier of this backend.
    fn object_root(&self) -> &str;

    /// Whether `value` already refers to an object in this storage.
    fn is_managed_reference(&self, value: &str) -> bool {
        let root = self.object_root();
        value.len() > root.len() && value.starts_with(root)
    }

    /// Object identifier for a storage key.
    fn object_id_for_key(&self, storage_key: &str) -> String {
        format!("{}{}", self.object_root(), storage_key)
    }

    /// Storage key behind an object identifier.
    fn key_for_object_id<'a>(&self, object_id: &'a str) -> StorageResult<&'a str> {
        object_id
            .strip_prefix(self.object_root())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                StorageError::InvalidKey(format!("Not an object of this storage: {}", object_id))
            })
    }

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
