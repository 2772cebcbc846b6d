//! Fetch Orchestration
//!
//! Composes the TTL cache, the rate gate and an upstream into a read path
//! that never blocks on the gate and never surfaces an upstream error.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::fetch::Upstream;
use crate::gate::{Admission, RateGate};

// == Source ==
/// Where a served payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Fresh cache hit
    Cache,
    /// Fetched from upstream on this call
    Upstream,
    /// Last successful upstream payload, served because the cache had none
    Stale,
    /// Empty default, nothing better was available
    Default,
}

impl Source {
    /// Label used in the `x-cache-source` response header.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Cache => "cache",
            Source::Upstream => "upstream",
            Source::Stale => "stale",
            Source::Default => "default",
        }
    }
}

/// A served payload and its origin.
#[derive(Debug, Clone)]
pub struct Fetched {
    /// Payload handed to the client
    pub payload: Value,
    /// Where `payload` came from
    pub source: Source,
}

// == Cached Fetcher ==
/// Cache-first reader that calls upstream only when the rate gate allows.
///
/// Keeps its own last-known-good copy per key, since the cache forgets an
/// entry the moment a read finds it expired.
pub struct CachedFetcher {
    cache: Arc<TtlCache<Value>>,
    gate: Arc<RateGate>,
    upstream: Arc<dyn Upstream>,
    last_good: Mutex<HashMap<String, Value>>,
}

impl CachedFetcher {
    // == Constructor ==
    /// Creates a fetcher with no last-known-good payloads.
    ///
    /// # Arguments
    /// * `cache` - Cache the fetcher reads and refills
    /// * `gate` - Rate gate shared with every other upstream path
    /// * `upstream` - Source of fresh payloads
    pub fn new(
        cache: Arc<TtlCache<Value>>,
        gate: Arc<RateGate>,
        upstream: Arc<dyn Upstream>,
    ) -> Self {
        Self {
            cache,
            gate,
            upstream,
            last_good: Mutex::new(HashMap::new()),
        }
    }

    // == Fetch ==
    /// Serves `key` from cache, upstream, or a fallback, in that order.
    ///
    /// 1. Fresh cache hit is returned as is.
    /// 2. On a miss the gate is asked; a denial serves the fallback.
    /// 3. On a grant upstream is called. Success is written back to the
    ///    cache; failure is logged and serves the fallback.
    pub async fn fetch(&self, key: &str) -> Fetched {
        if let Some(payload) = self.cache.get(key) {
            debug!(key, "serving cached payload");
            return Fetched {
                payload,
                source: Source::Cache,
            };
        }

        if let Admission::Denied(reason) = self.gate.try_acquire() {
            debug!(key, ?reason, "upstream call not admitted");
            return self.fallback(key);
        }

        // No lock is held across this await
        match self.upstream.fetch().await {
            Ok(payload) => {
                self.cache.set(key, payload.clone());
                self.remember(key, &payload);
                info!(key, "refreshed payload from upstream");
                Fetched {
                    payload,
                    source: Source::Upstream,
                }
            }
            Err(err) => {
                warn!(key, error = %err, "upstream fetch failed, degrading to fallback");
                self.fallback(key)
            }
        }
    }

    fn remember(&self, key: &str, payload: &Value) {
        self.last_good
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), payload.clone());
    }

    fn fallback(&self, key: &str) -> Fetched {
        let stale = self
            .last_good
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned();

        match stale {
            Some(payload) => Fetched {
                payload,
                source: Source::Stale,
            },
            None => {
                warn!(key, "no cached or last-known-good payload, serving empty default");
                Fetched {
                    payload: self.upstream.empty_payload(),
                    source: Source::Default,
                }
            }
        }
    }
}
