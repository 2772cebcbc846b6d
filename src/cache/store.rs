//! Cache Store Module
//!
//! TTL cache engine: a single mutex-guarded HashMap with lazy, read-triggered
//! expiry. There is no background sweeper and no size bound.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats};
use crate::clock::{Clock, SystemClock};

/// Map and counters, guarded together so a read sees either the old or the
/// new entry in full.
#[derive(Debug)]
struct Inner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    stats: CacheStats,
}

// == TTL Cache ==
/// Key-value store whose entries are fresh for a fixed TTL after each write.
///
/// Payloads are opaque. `get` hands back a clone; callers should treat it as
/// read-only.
pub struct TtlCache<V = Value> {
    inner: Mutex<Inner<V>>,
    ttl_ms: u64,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    // == Constructor ==
    /// Creates an empty cache.
    ///
    /// # Arguments
    /// * `ttl_ms` - Freshness window in milliseconds
    /// * `clock` - Time source used to stamp and age entries
    pub fn new(ttl_ms: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                stats: CacheStats::new(),
            }),
            ttl_ms,
            clock,
        }
    }

    /// Creates an empty cache on the system clock.
    pub fn with_ttl_ms(ttl_ms: u64) -> Self {
        Self::new(ttl_ms, Arc::new(SystemClock))
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        // Every write replaces whole values; state is consistent after a poison.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Set ==
    /// Stores `payload` under `key`, replacing any previous entry and
    /// restarting its freshness clock.
    pub fn set(&self, key: impl Into<String>, payload: V) {
        let now = self.clock.now_ms();
        let mut inner = self.lock();
        inner.entries.insert(key.into(), CacheEntry::new(payload, now));
        let len = inner.entries.len();
        inner.stats.set_total_entries(len);
    }

    // == Get ==
    /// Returns the payload for `key` while it is fresh.
    ///
    /// An expired entry is removed as a side effect and `None` is returned,
    /// making it indistinguishable from a key that was never set.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();
        let mut guard = self.lock();
        let inner = &mut *guard;

        let age_ms = match inner.entries.get(key) {
            None => {
                inner.stats.record_miss();
                return None;
            }
            Some(entry) if !entry.is_expired(now, self.ttl_ms) => {
                let payload = entry.payload.clone();
                inner.stats.record_hit();
                return Some(payload);
            }
            Some(entry) => entry.age_ms(now),
        };

        inner.entries.remove(key);
        inner.stats.record_expiration();
        let len = inner.entries.len();
        inner.stats.set_total_entries(len);
        debug!(key, age_ms, "cache entry expired on read");
        None
    }

    // == Contains Key ==
    /// Reports whether an entry is physically stored, fresh or not.
    ///
    /// Does not evict and does not touch statistics.
    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether one was present.
    pub fn delete(&self, key: &str) -> bool {
        let mut inner = self.lock();
        let removed = inner.entries.remove(key).is_some();
        let len = inner.entries.len();
        inner.stats.set_total_entries(len);
        removed
    }

    /// Removes every entry. Statistics counters are kept.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.stats.set_total_entries(0);
    }

    // == Stats ==
    /// Returns a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let mut stats = inner.stats.clone();
        stats.set_total_entries(inner.entries.len());
        stats
    }

    // == Length ==
    /// Number of stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    // == Is Empty ==
    /// Returns true if no entry is stored.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Freshness window in milliseconds.
    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }
}

// == Debug ==
// Omits entries.
impl<V> std::fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("ttl_ms", &self.ttl_ms)
            .finish_non_exhaustive()
    }
}
