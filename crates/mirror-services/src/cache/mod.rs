//! In-process TTL caches
//!
//! Two caches sit in front of the expensive steps of mirroring:
//! - [`FileIdentityCache`]: source URL to mirrored object id (skips fetch and upload)
//! - [`TemporaryUrlCache`]: object id to issued temporary URL (skips re-signing)
//!
//! Both are built once per process (see [`MirrorCaches`]) and shared by `Arc`.

mod file_identity;
mod temporary_url;
mod ttl;

pub use file_identity::FileIdentityCache;
pub use temporary_url::TemporaryUrlCache;
pub use ttl::{CacheEntry, TtlCache};

use std::sync::Arc;

use mirror_core::{CachePolicy, Clock, Config};

/// The pair of caches used by the orchestrator.
#[derive(Debug)]
pub struct MirrorCaches {
    pub file_ids: FileIdentityCache,
    pub temp_urls: TemporaryUrlCache,
}

impl MirrorCaches {
    pub fn new(
        file_policy: CachePolicy,
        temp_url_policy: CachePolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            file_ids: FileIdentityCache::new(file_policy, clock.clone()),
            temp_urls: TemporaryUrlCache::new(temp_url_policy, clock),
        }
    }

    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            config.file_cache_policy(),
            config.temp_url_cache_policy(),
            clock,
        )
    }
}
