//! Origin system client.
//!
//! Resolves origin-supplied attachment paths into absolute URLs, fetches records
//! and attachments with the origin API key, and retries a certificate-trust
//! failure once over plain HTTP.

pub mod client;
pub mod error;
pub mod fetcher;
pub mod url;

pub use client::{AttachmentSource, FetchedRecord, OriginClient, RecordSource};
pub use error::{FetchError, OriginError};
pub use fetcher::{AttemptOutcome, FetchedResponse, HttpTransport, ResilientFetcher, Transport};
pub use url::{downgrade_to_http, resolve_effective_base, to_absolute_url};
