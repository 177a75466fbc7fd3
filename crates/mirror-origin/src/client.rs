//! Origin system client
//!
//! Record lookups and attachment downloads, both authenticated with the
//! `X-API-Key` header and both going through [`ResilientFetcher`].

use std::time::Duration;

use async_trait::async_trait;
use mirror_core::{OriginCredentials, StudentRecord};
use serde_json::Value;

use crate::error::{FetchError, OriginError};
use crate::fetcher::{FetchedResponse, HttpTransport, ResilientFetcher, Transport};
use crate::url::resolve_effective_base;

/// A record together with the base address the origin actually answered from.
#[derive(Debug, Clone)]
pub struct FetchedRecord {
    pub record: StudentRecord,
    pub effective_base: String,
}

/// Source of student records.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_student(
        &self,
        credentials: &OriginCredentials,
        student_id: &str,
    ) -> Result<FetchedRecord, OriginError>;
}

/// Source of raw attachment bytes. Status codes are left to the caller.
#[async_trait]
pub trait AttachmentSource: Send + Sync {
    async fn fetch_attachment(
        &self,
        url: &str,
        api_key: &str,
    ) -> Result<FetchedResponse, FetchError>;
}

#[derive(Clone, Debug)]
pub struct OriginClient<T: Transport = HttpTransport> {
    fetcher: ResilientFetcher<T>,
}

impl OriginClient<HttpTransport> {
    /// Client with the given per-call timeout.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self::with_transport(HttpTransport::new(timeout)?))
    }
}

impl<T: Transport> OriginClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            fetcher: ResilientFetcher::new(transport),
        }
    }
}

#[async_trait]
impl<T: Transport> RecordSource for OriginClient<T> {
    async fn fetch_student(
        &self,
        credentials: &OriginCredentials,
        student_id: &str,
    ) -> Result<FetchedRecord, OriginError> {
        let url = format!(
            "{}/api/students/{}",
            credentials.base_url,
            urlencoding::encode(student_id)
        );
        let start = std::time::Instant::now();

        let response = self
            .fetcher
            .fetch(&url, Some(credentials.api_key.as_str()))
            .await?;

        tracing::debug!(
            url = %url,
            status = response.status,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Origin record fetch completed"
        );

        if !response.is_success() {
            return Err(OriginError::Status {
                status: response.status,
                message: error_message(&response),
            });
        }

        let record = match serde_json::from_slice::<Value>(&response.body) {
            Ok(Value::Object(map)) => StudentRecord(map),
            Ok(_) => {
                return Err(OriginError::Decode(
                    "record body is not a JSON object".to_string(),
                ))
            }
            Err(e) => return Err(OriginError::Decode(e.to_string())),
        };

        Ok(FetchedRecord {
            record,
            effective_base: resolve_effective_base(&credentials.base_url, &response.final_url),
        })
    }
}

#[async_trait]
impl<T: Transport> AttachmentSource for OriginClient<T> {
    async fn fetch_attachment(
        &self,
        url: &str,
        api_key: &str,
    ) -> Result<FetchedResponse, FetchError> {
        self.fetcher.fetch(url, Some(api_key)).await
    }
}

/// `error` or `message` from a JSON error body, else `HTTP <status>`.
fn error_message(response: &FetchedResponse) -> String {
    serde_json::from_slice::<Value>(&response.body)
        .ok()
        .and_then(|body| {
            ["error", "message"].iter().find_map(|field| {
                body.get(field)
                    .and_then(Value::as_str)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| format!("HTTP {}", response.status))
}
