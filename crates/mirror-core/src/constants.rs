//! Policy constants for the attachment mirror.

/// Header carrying the origin API key on every origin request.
pub const ORIGIN_API_KEY_HEADER: &str = "X-API-Key";

/// Path marker used to recover the origin base address from an observed response URL.
pub const ORIGIN_API_MARKER: &str = "/api/";

/// Per-call timeout for record and attachment fetches.
pub const ORIGIN_TIMEOUT_SECS: u64 = 60;

/// Simultaneous in-flight mirror operations per record.
pub const MIRROR_CONCURRENCY: usize = 2;

/// Storage prefix for mirrored attachments.
pub const MIRROR_PATH_PREFIX: &str = "origin-sync/preview";

/// Storage prefix for generated attachment bundles.
pub const BUNDLE_PATH_PREFIX: &str = "temp";

/// How long a mirrored object id is reused for the same source URL (2 hours).
pub const FILE_CACHE_TTL_SECS: u64 = 2 * 60 * 60;

/// How long an issued temporary URL is reused (45 minutes).
///
/// Must stay below [`TEMP_URL_MAX_AGE_SECS`].
pub const TEMP_URL_CACHE_TTL_SECS: u64 = 45 * 60;

/// Validity requested for every issued temporary URL (1 hour).
pub const TEMP_URL_MAX_AGE_SECS: u64 = 60 * 60;

/// Upper bound on entries held by each in-process cache.
pub const CACHE_MAX_ENTRIES: usize = 10_000;

/// Record status that permits bundling attachments.
pub const REVIEWED_STATUS: &str = "reviewed";
