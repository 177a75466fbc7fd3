use std::sync::Arc;

use mirror_core::{CachePolicy, Clock};

use super::ttl::TtlCache;

/// Object id to a temporary URL already issued for it.
///
/// The TTL must stay below the validity requested for the URL itself, which
/// configuration validation enforces.
#[derive(Debug)]
pub struct TemporaryUrlCache {
    inner: TtlCache<String, String>,
}

impl TemporaryUrlCache {
    pub fn new(policy: CachePolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: TtlCache::new(policy, clock),
        }
    }

    pub fn read(&self, object_id: &str) -> Option<String> {
        self.inner.get(object_id)
    }

    pub fn write(&self, object_id: &str, url: &str) {
        if object_id.is_empty() || url.is_empty() {
            return;
        }
        self.inner.insert(object_id.to_string(), url.to_string());
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
