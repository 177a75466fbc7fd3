use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use lru::LruCache;
use mirror_core::{CachePolicy, Clock};

/// A cached value and the instant it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expire_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    /// An entry is absent from `expire_at` onwards.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expire_at
    }
}

/// Size-bounded map whose entries expire a fixed time after they are written.
///
/// Expiry is lazy: an expired entry is evicted by the read that finds it. When
/// the size bound is reached the least recently used entry is dropped.
pub struct TtlCache<K: Hash + Eq, V> {
    entries: Mutex<LruCache<K, CacheEntry<V>>>,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl<K: Hash + Eq, V> fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("ttl", &self.ttl)
            .field("len", &self.lock().len())
            .finish()
    }
}

impl<K: Hash + Eq, V: Clone> TtlCache<K, V> {
    pub fn new(policy: CachePolicy, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(policy.max_entries).unwrap_or(NonZeroUsize::MIN);
        let ttl = chrono::Duration::from_std(policy.ttl)
            .unwrap_or_else(|_| chrono::Duration::days(36_500));
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            clock,
        }
    }

    /// Current time according to the cache's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Live value for `key`. Evicts and misses when the entry has expired.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        let mut entries = self.lock();

        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }

        entries.pop(key);
        None
    }

    /// Store `value`, replacing any previous entry.
    pub fn insert(&self, key: K, value: V) {
        let expire_at = self
            .clock
            .now()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.lock().put(key, CacheEntry { value, expire_at });
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lock().pop(key).map(|entry| entry.value)
    }

    /// Number of stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Hash + Eq, V> TtlCache<K, V> {
    // Every critical section is a single map operation, so a poisoned lock
    // still holds a consistent map.
    fn lock(&self) -> MutexGuard<'_, LruCache<K, CacheEntry<V>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
