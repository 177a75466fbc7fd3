//! Student detail and attachment bundle services.
//!
//! Both fetch a record from the origin, mirror its attachments into managed
//! storage and hand back temporary URLs. Detail returns one URL per field; the
//! bundle packs every mirrored attachment into a single ZIP.

use std::sync::Arc;
use std::time::{Duration, Instant};

use mirror_core::{
    AppError, AttachmentBundle, AttachmentFieldSet, Clock, Config, OriginCredentials,
    OriginOverrides, OriginSettings, StudentDetail, StudentRecord,
};
use mirror_origin::{AttachmentSource, OriginClient, RecordSource};
use mirror_storage::keys::{key_extension, sanitize_segment};
use mirror_storage::{Storage, TemporaryUrlRequest};

use crate::archive::{create_zip_archive, ArchiveEntry};
use crate::cache::MirrorCaches;
use crate::mirror::{AttachmentMirror, MirrorRequest};

const BUNDLE_CONTENT_TYPE: &str = "application/zip";

/// A fetched record ready for mirroring.
struct LoadedRecord {
    record: StudentRecord,
    request: MirrorRequest,
}

pub struct StudentDetailService {
    records: Arc<dyn RecordSource>,
    mirror: AttachmentMirror,
    clock: Arc<dyn Clock>,
    origin: OriginSettings,
    fields: AttachmentFieldSet,
    bundle_prefix: String,
    temp_url_max_age: Duration,
}

impl StudentDetailService {
    /// Service talking to the configured origin over HTTP.
    pub fn from_config(
        config: &Config,
        storage: Arc<dyn Storage>,
        caches: Arc<MirrorCaches>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let client = Arc::new(OriginClient::new(config.origin_timeout())?);
        Ok(Self::with_sources(
            config,
            storage,
            client.clone(),
            client,
            caches,
            clock,
        ))
    }

    pub fn with_sources(
        config: &Config,
        storage: Arc<dyn Storage>,
        records: Arc<dyn RecordSource>,
        attachments: Arc<dyn AttachmentSource>,
        caches: Arc<MirrorCaches>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            records,
            mirror: AttachmentMirror::from_config(config, storage, attachments, caches),
            clock,
            origin: config.origin().clone(),
            fields: config.attachment_fields().clone(),
            bundle_prefix: config.bundle_path_prefix().to_string(),
            temp_url_max_age: config.temp_url_max_age(),
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        self.mirror.storage()
    }

    /// Record with a client id and temporary URLs for its attachments.
    pub async fn get_student_detail(
        &self,
        student_id: &str,
        overrides: &OriginOverrides,
    ) -> Result<StudentDetail, AppError> {
        let LoadedRecord { record, request } = self.load(student_id, overrides).await?;
        let download_urls = self.mirror.mirror_attachments(&request).await;

        Ok(StudentDetail {
            student: record,
            download_urls,
        })
    }

    /// Pack a reviewed record's attachments into a ZIP in managed storage.
    pub async fn bundle_attachments(
        &self,
        student_id: &str,
        overrides: &OriginOverrides,
    ) -> Result<AttachmentBundle, AppError> {
        let start = Instant::now();
        let LoadedRecord { record, request } = self.load(student_id, overrides).await?;

        if !record.is_reviewed() {
            return Err(AppError::Conflict(
                "only reviewed records can be bundled".to_string(),
            ));
        }

        let id_card = record.text("id_card").unwrap_or_default();
        let name = record.text("name").unwrap_or_default();

        let entries: Vec<ArchiveEntry> = self
            .mirror
            .mirror_objects(&request)
            .await
            .into_iter()
            .filter_map(|result| {
                let object_id = result.object_id.filter(|id| !id.is_empty())?;
                let entry_name = format!(
                    "{}-{}-{}{}",
                    id_card,
                    name,
                    AttachmentFieldSet::label(&result.field_name),
                    key_extension(&object_id).unwrap_or_default()
                );
                Some(ArchiveEntry::new(entry_name, object_id))
            })
            .collect();

        let storage = self.mirror.storage();
        let archive = create_zip_archive(storage.as_ref(), entries)
            .await
            .map_err(|e| AppError::InternalWithSource {
                message: "Failed to build attachment archive".to_string(),
                source: e,
            })?;
        if archive.file_count == 0 {
            return Err(AppError::NotFound(
                "record has no downloadable attachments".to_string(),
            ));
        }

        let owner = if id_card.trim().is_empty() {
            request.record_id.as_str()
        } else {
            id_card
        };
        let key = bundle_storage_key(
            &self.bundle_prefix,
            owner,
            self.clock.now().timestamp_millis(),
        );
        let object_id = storage
            .upload_with_key(&key, archive.data, BUNDLE_CONTENT_TYPE)
            .await?;

        let issued = storage
            .issue_temporary_urls(&[TemporaryUrlRequest {
                object_id: object_id.clone(),
                max_age: self.temp_url_max_age,
            }])
            .await?;
        let download_url = issued
            .into_iter()
            .find(|temp| temp.object_id == object_id && !temp.url.is_empty())
            .map(|temp| temp.url)
            .ok_or_else(|| {
                AppError::Storage(format!("No temporary URL issued for {}", object_id))
            })?;

        tracing::info!(
            record_id = %request.record_id,
            object_id = %object_id,
            file_count = archive.file_count,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Attachment bundle created"
        );

        Ok(AttachmentBundle {
            object_id,
            download_url,
            file_count: archive.file_count,
        })
    }

    async fn load(
        &self,
        student_id: &str,
        overrides: &OriginOverrides,
    ) -> Result<LoadedRecord, AppError> {
        let student_id = student_id.trim();
        if student_id.is_empty() {
            return Err(AppError::InvalidInput("student id is required".to_string()));
        }

        let credentials = OriginCredentials::resolve(&self.origin, overrides)?;
        let fetched = self.records.fetch_student(&credentials, student_id).await?;

        let record = fetched.record.with_client_id();
        let record_id = record.client_id().unwrap_or(student_id).to_string();
        let request = MirrorRequest {
            record_id,
            effective_base: fetched.effective_base,
            api_key: credentials.api_key,
            tasks: record.attachment_tasks(&self.fields),
        };

        Ok(LoadedRecord { record, request })
    }
}

fn bundle_storage_key(prefix: &str, owner: &str, millis: i64) -> String {
    let name = format!("attachments_{}_{}.zip", sanitize_segment(owner), millis);
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        name
    } else {
        format!("{}/{}", prefix, name)
    }
}
