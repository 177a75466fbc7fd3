//! Authenticated GET against the origin with a single certificate fallback.
//!
//! The origin is known to serve HTTPS with an incomplete certificate chain. A
//! trust failure on an `https://` URL is therefore retried exactly once over
//! `http://` to the same host and path. Every other failure is returned as is.

use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use mirror_core::constants::ORIGIN_API_KEY_HEADER;
use reqwest::Client;

use crate::error::FetchError;
use crate::url::{downgrade_to_http, is_https};

/// Markers of an untrusted issuer or incomplete chain somewhere in an error
/// chain. Hostname mismatches, expired certificates and other TLS errors are
/// not matched and never downgrade.
const TRUST_FAILURE_MARKERS: &[&str] = &[
    "unknownissuer",
    "unable to get local issuer",
    "unable to verify the first certificate",
    "self signed certificate",
    "self-signed certificate",
];

/// Status, content type and body of an origin response. Non-2xx statuses are
/// not errors at this level.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    /// URL of the final response, after redirects.
    pub final_url: String,
    pub body: Bytes,
}

impl FetchedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One HTTP GET. Implemented over reqwest in production and faked in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, api_key: Option<&str>) -> Result<FetchedResponse, FetchError>;
}

/// reqwest-backed transport with a fixed per-call timeout.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, api_key: Option<&str>) -> Result<FetchedResponse, FetchError> {
        let mut request = self.client.get(url);
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            request = request.header(ORIGIN_API_KEY_HEADER, key);
        }

        let response = request.send().await.map_err(classify)?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Body(error_chain(&e)))?;

        Ok(FetchedResponse {
            status,
            content_type,
            final_url,
            body,
        })
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    let chain = error_chain(&err);
    if is_trust_failure(&chain) {
        FetchError::TrustFailure(chain)
    } else if err.is_timeout() {
        FetchError::Timeout(chain)
    } else if err.is_builder() {
        FetchError::InvalidUrl(chain)
    } else {
        FetchError::Request(chain)
    }
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn is_trust_failure(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    TRUST_FAILURE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Result of one attempt, tagged for the caller to decide on a retry.
#[derive(Debug)]
pub enum AttemptOutcome {
    Response(FetchedResponse),
    /// Certificate trust failure on an `https://` URL.
    RetryableTrustFailure(FetchError),
    Failure(FetchError),
}

/// Fetcher applying the one-shot HTTPS to HTTP downgrade.
#[derive(Clone, Debug)]
pub struct ResilientFetcher<T: Transport = HttpTransport> {
    transport: T,
}

impl<T: Transport> ResilientFetcher<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub async fn attempt(&self, url: &str, api_key: Option<&str>) -> AttemptOutcome {
        match self.transport.get(url, api_key).await {
            Ok(response) => AttemptOutcome::Response(response),
            Err(err @ FetchError::TrustFailure(_)) if is_https(url) => {
                AttemptOutcome::RetryableTrustFailure(err)
            }
            Err(err) => AttemptOutcome::Failure(err),
        }
    }

    pub async fn fetch(
        &self,
        url: &str,
        api_key: Option<&str>,
    ) -> Result<FetchedResponse, FetchError> {
        match self.attempt(url, api_key).await {
            AttemptOutcome::Response(response) => Ok(response),
            AttemptOutcome::Failure(err) => Err(err),
            AttemptOutcome::RetryableTrustFailure(err) => {
                let Some(fallback) = downgrade_to_http(url) else {
                    return Err(err);
                };
                tracing::warn!(
                    url = %url,
                    fallback_url = %fallback,
                    error = %err,
                    "Certificate verification failed, retrying over HTTP"
                );
                self.transport.get(&fallback, api_key).await
            }
        }
    }
}
