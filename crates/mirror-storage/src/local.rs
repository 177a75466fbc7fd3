use crate::signing::UrlSigner;
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use mirror_core::{Clock, SystemClock};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Object identifier root for local storage.
pub const LOCAL_OBJECT_ROOT: &str = "local://objects/";

/// Characters escaped when a storage key is placed in a URL path (`/` is kept).
const KEY_PATH_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Local filesystem storage implementation
///
/// Temporary URLs point at the API's `/files` route and carry an HMAC signature
/// and expiry that the route checks with [`LocalStorage::verify_signature`].
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    signer: UrlSigner,
    clock: Arc<dyn Clock>,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/mirror/objects")
    /// * `base_url` - Base URL for serving files (e.g., "http://localhost:3000/files")
    /// * `signing_secret` - Secret used to sign temporary URLs
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: String,
        signing_secret: impl Into<Vec<u8>>,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url: base_url.trim_end_matches('/').to_string(),
            signer: UrlSigner::new(signing_secret),
            clock: Arc::new(SystemClock),
        })
    }

    /// Use `clock` for temporary URL expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects keys containing path traversal sequences that could escape the
    /// base storage directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty()
            || storage_key.contains("..")
            || storage_key.starts_with('/')
            || storage_key.contains('\\')
        {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let path = self.base_path.join(storage_key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    fn object_path(&self, object_id: &str) -> StorageResult<(String, PathBuf)> {
        let key = self.key_for_object_id(object_id)?;
        let path = self.key_to_path(key)?;
        Ok((key.to_string(), path))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Signed URL for `key` valid until `expires` (unix seconds).
    pub fn signed_url(&self, key: &str, expires: i64) -> String {
        format!(
            "{}/{}?expires={}&signature={}",
            self.base_url,
            utf8_percent_encode(key, KEY_PATH_ENCODE),
            expires,
            self.signer.sign(key, expires)
        )
    }

    /// Check a `/files` request against the signature it carries.
    pub fn verify_signature(&self, key: &str, expires: i64, signature: &str) -> bool {
        self.signer
            .verify(key, expires, signature, self.clock.now().timestamp())
    }

    /// Read an object by storage key (used by the file-serving route).
    pub async fn read_key(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(storage_key)?;
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }
        fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<String> {
        let path = self.key_to_path(storage_key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(self.object_id_for_key(storage_key))
    }

    async fn download(&self, object_id: &str) -> StorageResult<Vec<u8>> {
        let (key, path) = self.object_path(object_id)?;
        let start = std::time::Instant::now();

        let data = self.read_key(&key).await?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage download successful"
        );

        Ok(data)
    }

    async fn exists(&self, object_id: &str) -> StorageResult<bool> {
        let (_, path) = self.object_path(object_id)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn get_presigned_url(
        &self,
        object_id: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let (key, _) = self.object_path(object_id)?;
        let expires = self.clock.now().timestamp() + expires_in.as_secs() as i64;
        Ok(self.signed_url(&key, expires))
    }

    fn object_root(&self) -> &str {
        LOCAL_OBJECT_ROOT
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
