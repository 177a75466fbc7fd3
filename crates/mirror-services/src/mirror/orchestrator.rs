use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mirror_core::{AttachmentTask, Config, DownloadUrlMap, FieldResult};
use mirror_origin::{to_absolute_url, AttachmentSource};
use mirror_storage::keys::{infer_extension, mirror_storage_key};
use mirror_storage::{Storage, TemporaryUrlRequest};

use super::error::MirrorError;
use super::pool::run_bounded;
use crate::cache::MirrorCaches;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Attachments of one record to mirror.
#[derive(Debug, Clone)]
pub struct MirrorRequest {
    /// Record identity used in storage keys.
    pub record_id: String,
    /// Base address relative attachment paths are resolved against.
    pub effective_base: String,
    pub api_key: String,
    pub tasks: Vec<AttachmentTask>,
}

impl MirrorRequest {
    /// Build a request from field name to source path pairs. Blank paths are
    /// not tasked.
    pub fn new<I, K, V>(
        record_id: impl Into<String>,
        effective_base: impl Into<String>,
        api_key: impl Into<String>,
        field_paths: I,
    ) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let tasks = field_paths
            .into_iter()
            .filter_map(|(field, path)| {
                let path = path.as_ref().trim();
                (!path.is_empty()).then(|| AttachmentTask::new(field, path))
            })
            .collect();

        Self {
            record_id: record_id.into(),
            effective_base: effective_base.into(),
            api_key: api_key.into(),
            tasks,
        }
    }
}

/// Bounded mirror orchestrator.
///
/// Per task: a managed reference passes through unchanged, a file-identity
/// cache hit is reused, otherwise the source is fetched, checked, uploaded to
/// its content-addressed key and cached. Failures stay with their field.
pub struct AttachmentMirror {
    storage: Arc<dyn Storage>,
    source: Arc<dyn AttachmentSource>,
    caches: Arc<MirrorCaches>,
    path_prefix: String,
    concurrency: usize,
    temp_url_max_age: Duration,
}

impl AttachmentMirror {
    pub fn new(
        storage: Arc<dyn Storage>,
        source: Arc<dyn AttachmentSource>,
        caches: Arc<MirrorCaches>,
        path_prefix: impl Into<String>,
        concurrency: usize,
        temp_url_max_age: Duration,
    ) -> Self {
        Self {
            storage,
            source,
            caches,
            path_prefix: path_prefix.into(),
            concurrency,
            temp_url_max_age,
        }
    }

    pub fn from_config(
        config: &Config,
        storage: Arc<dyn Storage>,
        source: Arc<dyn AttachmentSource>,
        caches: Arc<MirrorCaches>,
    ) -> Self {
        Self::new(
            storage,
            source,
            caches,
            config.mirror_path_prefix(),
            config.mirror_concurrency(),
            config.temp_url_max_age(),
        )
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Mirror every task and return field name to temporary URL.
    ///
    /// Fields that fail at any step are absent from the map; this never fails
    /// as a whole.
    pub async fn mirror_attachments(&self, request: &MirrorRequest) -> DownloadUrlMap {
        let start = Instant::now();
        let results = self.mirror_objects(request).await;

        let object_ids: Vec<String> = results
            .iter()
            .filter(|r| r.is_mirrored())
            .filter_map(|r| r.object_id.clone())
            .collect();
        let urls = self.resolve_temporary_urls(&object_ids).await;

        let mut download_urls = DownloadUrlMap::new();
        for result in results {
            let Some(object_id) = result.object_id.as_deref() else {
                continue;
            };
            if let Some(url) = urls.get(object_id) {
                download_urls.insert(result.field_name, url.clone());
            }
        }

        tracing::info!(
            record_id = %request.record_id,
            tasks = request.tasks.len(),
            resolved = download_urls.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Attachment mirroring completed"
        );

        download_urls
    }

    /// Mirror every task, one [`FieldResult`] per task in task order.
    pub async fn mirror_objects(&self, request: &MirrorRequest) -> Vec<FieldResult> {
        run_bounded(request.tasks.clone(), self.concurrency, |_, task| async move {
            match self.mirror_one(request, &task).await {
                Ok(object_id) => FieldResult::mirrored(task.field_name, object_id),
                Err(e) => {
                    tracing::warn!(
                        field = %task.field_name,
                        record_id = %request.record_id,
                        source_url = %task.source_url,
                        error = %e,
                        "Attachment mirror failed"
                    );
                    FieldResult::failed(task.field_name)
                }
            }
        })
        .await
    }

    /// Mirror a single attachment and return its object id.
    pub async fn mirror_one(
        &self,
        request: &MirrorRequest,
        task: &AttachmentTask,
    ) -> Result<String, MirrorError> {
        let raw = task.source_url.trim();
        if self.storage.is_managed_reference(raw) {
            return Ok(raw.to_string());
        }

        let source_url = to_absolute_url(&request.effective_base, raw);
        if let Some(object_id) = self.caches.file_ids.read(&source_url) {
            tracing::debug!(
                field = %task.field_name,
                source_url = %source_url,
                "File identity cache hit"
            );
            return Ok(object_id);
        }

        let response = self
            .source
            .fetch_attachment(&source_url, &request.api_key)
            .await?;
        if !response.is_success() {
            return Err(MirrorError::Status(response.status));
        }
        if response.body.is_empty() {
            return Err(MirrorError::EmptyContent);
        }

        let extension = infer_extension(&source_url, response.content_type.as_deref());
        let key = mirror_storage_key(
            &self.path_prefix,
            &request.record_id,
            &task.field_name,
            &source_url,
            &extension,
        );
        let content_type = response
            .content_type
            .as_deref()
            .unwrap_or(DEFAULT_CONTENT_TYPE);

        let object_id = self
            .storage
            .upload_with_key(&key, response.body.to_vec(), content_type)
            .await?;
        if object_id.is_empty() {
            return Err(MirrorError::EmptyObjectId);
        }

        self.caches.file_ids.write(&source_url, &object_id);
        Ok(object_id)
    }

    /// Temporary URLs for `object_ids`, from cache where possible and one batch
    /// issuance call for the rest. Ids that could not be resolved are absent.
    pub async fn resolve_temporary_urls(&self, object_ids: &[String]) -> HashMap<String, String> {
        let mut resolved = HashMap::new();
        let mut seen = HashSet::new();
        let mut requests = Vec::new();

        for object_id in object_ids {
            if object_id.is_empty() || !seen.insert(object_id.as_str()) {
                continue;
            }
            match self.caches.temp_urls.read(object_id) {
                Some(url) => {
                    resolved.insert(object_id.clone(), url);
                }
                None => requests.push(TemporaryUrlRequest {
                    object_id: object_id.clone(),
                    max_age: self.temp_url_max_age,
                }),
            }
        }

        if requests.is_empty() {
            return resolved;
        }

        match self.storage.issue_temporary_urls(&requests).await {
            Ok(issued) => {
                for temp in issued {
                    if temp.url.is_empty() {
                        continue;
                    }
                    self.caches.temp_urls.write(&temp.object_id, &temp.url);
                    resolved.insert(temp.object_id, temp.url);
                }
            }
            Err(e) => {
                tracing::warn!(
                    count = requests.len(),
                    error = %e,
                    "Temporary URL issuance failed"
                );
            }
        }

        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use mirror_core::{CachePolicy, Clock, ManualClock};
    use mirror_origin::{FetchError, FetchedResponse};
    use mirror_storage::{StorageBackend, StorageError, StorageResult, TemporaryUrl};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const BASE: &str = "https://origin.example.com";

    /// Origin fake: serves fixed responses by URL and tracks concurrency.
    #[derive(Default)]
    struct FakeOrigin {
        responses: HashMap<String, (u16, &'static [u8])>,
        calls: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakeOrigin {
        fn serving(files: &[(&str, u16, &'static [u8])]) -> Self {
            Self {
                responses: files
                    .iter()
                    .map(|(path, status, body)| (format!("{}{}", BASE, path), (*status, *body)))
                    .collect(),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AttachmentSource for FakeOrigin {
        async fn fetch_attachment(
            &self,
            url: &str,
            api_key: &str,
        ) -> Result<FetchedResponse, FetchError> {
            assert_eq!(api_key, "origin-key");
            self.calls.lock().unwrap().push(url.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match self.responses.get(url) {
                Some((status, body)) => Ok(FetchedResponse {
                    status: *status,
                    content_type: Some("image/jpeg".to_string()),
                    final_url: url.to_string(),
                    body: Bytes::from_static(body),
                }),
                None => Err(FetchError::Request("connection refused".to_string())),
            }
        }
    }

    /// In-memory storage with call counters.
    #[derive(Default)]
    struct MemoryStorage {
        objects: Mutex<HashMap<String, Vec<u8>>>,
        uploads: AtomicUsize,
        issue_calls: AtomicUsize,
        issued_ids: Mutex<Vec<String>>,
        fail_issuance: bool,
    }

    #[async_trait]
    impl Storage for MemoryStorage {
        async fn upload_with_key(
            &self,
            storage_key: &str,
            data: Vec<u8>,
            _content_type: &str,
        ) -> StorageResult<String> {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            self.objects
                .lock()
                .unwrap()
                .insert(storage_key.to_string(), data);
            Ok(self.object_id_for_key(storage_key))
        }

        async fn download(&self, object_id: &str) -> StorageResult<Vec<u8>> {
            let key = self.key_for_object_id(object_id)?;
            self.objects
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(object_id.to_string()))
        }

        async fn exists(&self, object_id: &str) -> StorageResult<bool> {
            let key = self.key_for_object_id(object_id)?;
            Ok(self.objects.lock().unwrap().contains_key(key))
        }

        async fn get_presigned_url(
            &self,
            object_id: &str,
            expires_in: Duration,
        ) -> StorageResult<String> {
            Ok(format!("https://cdn.test/{}?ttl={}", object_id, expires_in.as_secs()))
        }

        async fn issue_temporary_urls(
            &self,
            requests: &[TemporaryUrlRequest],
        ) -> StorageResult<Vec<TemporaryUrl>> {
            self.issue_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_issuance {
                return Err(StorageError::BackendError("rate limited".to_string()));
            }
            let mut issued = Vec::new();
            for request in requests {
                self.issued_ids
                    .lock()
                    .unwrap()
                    .push(request.object_id.clone());
                issued.push(TemporaryUrl {
                    object_id: request.object_id.clone(),
                    url: self
                        .get_presigned_url(&request.object_id, request.max_age)
                        .await?,
                });
            }
            Ok(issued)
        }

        fn object_root(&self) -> &str {
            "mem://objects/"
        }

        fn backend_type(&self) -> StorageBackend {
            StorageBackend::Local
        }
    }

    struct Harness {
        clock: Arc<ManualClock>,
        origin: Arc<FakeOrigin>,
        storage: Arc<MemoryStorage>,
        mirror: AttachmentMirror,
    }

    fn harness(origin: FakeOrigin, storage: MemoryStorage) -> Harness {
        let clock = Arc::new(ManualClock::default());
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let caches = Arc::new(MirrorCaches::new(
            CachePolicy::new(Duration::from_secs(2 * 60 * 60), 100),
            CachePolicy::new(Duration::from_secs(45 * 60), 100),
            dyn_clock,
        ));
        let origin = Arc::new(origin);
        let storage = Arc::new(storage);
        let mirror = AttachmentMirror::new(
            storage.clone(),
            origin.clone(),
            caches,
            "origin-sync/preview",
            2,
            Duration::from_secs(3600),
        );
        Harness {
            clock,
            origin,
            storage,
            mirror,
        }
    }

    fn request(fields: &[(&str, &str)]) -> MirrorRequest {
        MirrorRequest::new("42", BASE, "origin-key", fields.iter().copied())
    }

    #[tokio::test]
    async fn only_non_blank_fields_are_mirrored() {
        let h = harness(
            FakeOrigin::serving(&[("/files/a.jpg", 200, b"jpeg")]),
            MemoryStorage::default(),
        );
        let req = request(&[("photo", "/files/a.jpg"), ("diploma", "")]);
        assert_eq!(req.tasks.len(), 1);

        let urls = h.mirror.mirror_attachments(&req).await;

        assert_eq!(urls.len(), 1);
        let key = mirror_storage_key(
            "origin-sync/preview",
            "42",
            "photo",
            "https://origin.example.com/files/a.jpg",
            ".jpg",
        );
        assert_eq!(
            urls.get("photo").map(String::as_str),
            Some(format!("https://cdn.test/mem://objects/{}?ttl=3600", key).as_str())
        );
        assert!(!urls.contains_key("diploma"));
    }

    #[tokio::test]
    async fn failed_field_is_omitted_and_siblings_survive() {
        let h = harness(
            FakeOrigin::serving(&[
                ("/files/a.jpg", 200, b"a"),
                ("/files/b.jpg", 500, b"oops"),
                ("/files/c.jpg", 200, b"c"),
            ]),
            MemoryStorage::default(),
        );
        let req = request(&[
            ("photo_path", "/files/a.jpg"),
            ("diploma_path", "/files/b.jpg"),
            ("id_card_front_path", "/files/c.jpg"),
        ]);

        let urls = h.mirror.mirror_attachments(&req).await;

        assert_eq!(
            urls.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["id_card_front_path", "photo_path"]
        );
        assert_eq!(h.storage.uploads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_body_and_unreachable_source_are_contained() {
        let h = harness(
            FakeOrigin::serving(&[("/files/empty.jpg", 200, b"")]),
            MemoryStorage::default(),
        );
        let req = request(&[
            ("photo_path", "/files/empty.jpg"),
            ("diploma_path", "/files/missing.jpg"),
        ]);

        let results = h.mirror.mirror_objects(&req).await;

        assert_eq!(
            results,
            vec![
                FieldResult::failed("photo_path"),
                FieldResult::failed("diploma_path"),
            ]
        );
        assert_eq!(h.storage.uploads.load(Ordering::SeqCst), 0);
        assert_eq!(h.storage.issue_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn results_follow_task_order() {
        let h = harness(
            FakeOrigin::serving(&[
                ("/files/1.jpg", 200, b"1"),
                ("/files/2.jpg", 200, b"2"),
                ("/files/3.jpg", 200, b"3"),
                ("/files/4.jpg", 200, b"4"),
            ]),
            MemoryStorage::default(),
        );
        let req = request(&[
            ("f1", "/files/1.jpg"),
            ("f2", "/files/2.jpg"),
            ("f3", "/files/3.jpg"),
            ("f4", "/files/4.jpg"),
        ]);

        let results = h.mirror.mirror_objects(&req).await;

        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.field_name, format!("f{}", i + 1));
            let id = result.object_id.as_deref().unwrap();
            assert!(id.contains(&format!("/f{}_", i + 1)));
        }
        assert_eq!(h.origin.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cached_source_skips_fetch_and_upload() {
        let h = harness(
            FakeOrigin::serving(&[("/files/a.jpg", 200, b"a")]),
            MemoryStorage::default(),
        );
        let req = request(&[("photo_path", "/files/a.jpg")]);

        let first = h.mirror.mirror_objects(&req).await;
        let second = h.mirror.mirror_objects(&req).await;

        assert_eq!(first, second);
        assert_eq!(h.origin.calls(), 1);
        assert_eq!(h.storage.uploads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_source_is_fetched_again() {
        let h = harness(
            FakeOrigin::serving(&[("/files/a.jpg", 200, b"a")]),
            MemoryStorage::default(),
        );
        let req = request(&[("photo_path", "/files/a.jpg")]);

        h.mirror.mirror_objects(&req).await;
        h.clock.advance(chrono::Duration::hours(2));
        h.mirror.mirror_objects(&req).await;

        assert_eq!(h.origin.calls(), 2);
        assert_eq!(h.storage.uploads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn managed_reference_passes_through() {
        let h = harness(FakeOrigin::default(), MemoryStorage::default());
        let req = request(&[("photo_path", "mem://objects/already/there.jpg")]);

        let urls = h.mirror.mirror_attachments(&req).await;

        assert_eq!(h.origin.calls(), 0);
        assert_eq!(h.storage.uploads.load(Ordering::SeqCst), 0);
        assert_eq!(
            urls.get("photo_path").map(String::as_str),
            Some("https://cdn.test/mem://objects/already/there.jpg?ttl=3600")
        );
    }

    #[tokio::test]
    async fn temporary_urls_are_batched_and_cached() {
        let h = harness(
            FakeOrigin::serving(&[("/files/a.jpg", 200, b"a"), ("/files/b.jpg", 200, b"b")]),
            MemoryStorage::default(),
        );
        let req = request(&[("photo_path", "/files/a.jpg"), ("diploma_path", "/files/b.jpg")]);

        let first = h.mirror.mirror_attachments(&req).await;
        assert_eq!(h.storage.issue_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.storage.issued_ids.lock().unwrap().len(), 2);

        let second = h.mirror.mirror_attachments(&req).await;
        assert_eq!(first, second);
        assert_eq!(h.storage.issue_calls.load(Ordering::SeqCst), 1);

        h.clock.advance(chrono::Duration::minutes(45));
        h.mirror.mirror_attachments(&req).await;
        assert_eq!(h.storage.issue_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn duplicate_objects_are_issued_once() {
        let h = harness(FakeOrigin::default(), MemoryStorage::default());
        let ids = vec![
            "mem://objects/a".to_string(),
            "mem://objects/a".to_string(),
            String::new(),
        ];

        let urls = h.mirror.resolve_temporary_urls(&ids).await;

        assert_eq!(urls.len(), 1);
        assert_eq!(*h.storage.issued_ids.lock().unwrap(), vec!["mem://objects/a"]);
    }

    #[tokio::test]
    async fn issuance_failure_yields_empty_map() {
        let h = harness(
            FakeOrigin::serving(&[("/files/a.jpg", 200, b"a")]),
            MemoryStorage {
                fail_issuance: true,
                ..Default::default()
            },
        );
        let req = request(&[("photo_path", "/files/a.jpg")]);

        let urls = h.mirror.mirror_attachments(&req).await;

        assert!(urls.is_empty());
        assert_eq!(h.storage.uploads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn same_source_maps_to_same_key() {
        let h = harness(
            FakeOrigin::serving(&[("/files/a.jpg", 200, b"a")]),
            MemoryStorage::default(),
        );
        let req = request(&[("photo_path", "/files/a.jpg")]);

        let first = h.mirror.mirror_objects(&req).await;
        h.clock.advance(chrono::Duration::hours(3));
        let second = h.mirror.mirror_objects(&req).await;

        assert_eq!(first[0].object_id, second[0].object_id);
        assert_eq!(h.storage.objects.lock().unwrap().len(), 1);
    }
}
