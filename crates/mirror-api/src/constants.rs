//! API constants

/// Versioned prefix for student routes.
pub const API_PREFIX: &str = "/api/v0";

/// Prefix of the signed local file route.
pub const FILES_PREFIX: &str = "/files";

/// Per-request override of the configured origin base URL.
pub const ORIGIN_BASE_URL_OVERRIDE_HEADER: &str = "x-origin-base-url";

/// Per-request override of the configured origin API key.
pub const ORIGIN_API_KEY_OVERRIDE_HEADER: &str = "x-origin-api-key";
