use std::sync::Arc;

use mirror_core::{CachePolicy, Clock, MirroredObject};

use super::ttl::TtlCache;

/// Source URL to the object it was mirrored into.
///
/// Written only after a confirmed upload, so a hit means the object exists in
/// managed storage and the source does not need to be fetched again.
#[derive(Debug)]
pub struct FileIdentityCache {
    inner: TtlCache<String, MirroredObject>,
}

impl FileIdentityCache {
    pub fn new(policy: CachePolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: TtlCache::new(policy, clock),
        }
    }

    /// Object id mirrored from `source_url`, if still cached.
    pub fn read(&self, source_url: &str) -> Option<String> {
        self.inner.get(source_url).map(|object| object.object_id)
    }

    /// Full cached record for `source_url`.
    pub fn lookup(&self, source_url: &str) -> Option<MirroredObject> {
        self.inner.get(source_url)
    }

    /// Remember a completed upload. Empty source URLs or object ids are ignored.
    pub fn write(&self, source_url: &str, object_id: &str) {
        if source_url.is_empty() || object_id.is_empty() {
            return;
        }
        let object = MirroredObject {
            source_url: source_url.to_string(),
            object_id: object_id.to_string(),
            stored_at: self.inner.now(),
        };
        self.inner.insert(source_url.to_string(), object);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
