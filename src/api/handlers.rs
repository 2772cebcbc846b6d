//! API Handlers
//!
//! HTTP request handlers for each endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::Value;

use crate::cache::TtlCache;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::fetch::{CachedFetcher, Fetched, Upstream};
use crate::gate::RateGate;
use crate::models::{DeleteResponse, EntryResponse, HealthResponse, StatsResponse};

/// Response header naming where the feed payload came from.
pub const CACHE_SOURCE_HEADER: &str = "x-cache-source";

// == Feed Route ==
/// One cache-backed feed: its fetcher and the cache slot it serves.
#[derive(Clone)]
pub struct FeedRoute {
    /// Cache-first reader in front of this feed's upstream
    pub fetcher: Arc<CachedFetcher>,
    /// Cache slot the feed is stored under
    pub key: Arc<str>,
}

impl FeedRoute {
    /// Creates a feed whose fetcher shares the given cache and gate.
    pub fn new(
        cache: &Arc<TtlCache<Value>>,
        gate: &Arc<RateGate>,
        upstream: Arc<dyn Upstream>,
        key: impl Into<Arc<str>>,
    ) -> Self {
        let fetcher = CachedFetcher::new(cache.clone(), gate.clone(), upstream);
        Self {
            fetcher: Arc::new(fetcher),
            key: key.into(),
        }
    }

    /// Serves this feed's slot through the cache-first read path.
    pub async fn fetch(&self) -> Fetched {
        self.fetcher.fetch(&self.key).await
    }
}

// == App State ==
/// Application state shared across all handlers.
///
/// The cache and the gate are created once per process and shared by
/// reference. Every feed's fetcher holds clones of the same `Arc`s, so all
/// upstream paths draw on one rate budget.
#[derive(Clone)]
pub struct AppState {
    /// Process-wide TTL cache
    pub cache: Arc<TtlCache<Value>>,
    /// Process-wide rate gate
    pub gate: Arc<RateGate>,
    /// Item feed behind `GET /api/feed`
    pub feed: FeedRoute,
    /// Posts feed behind `GET /api/sentiment`
    pub sentiment: FeedRoute,
}

impl AppState {
    /// Creates a new AppState wiring both feeds to the given cache and gate.
    pub fn new(
        cache: Arc<TtlCache<Value>>,
        gate: Arc<RateGate>,
        feed: (Arc<dyn Upstream>, &str),
        sentiment: (Arc<dyn Upstream>, &str),
    ) -> Self {
        let feed = FeedRoute::new(&cache, &gate, feed.0, feed.1);
        let sentiment = FeedRoute::new(&cache, &gate, sentiment.0, sentiment.1);
        Self {
            cache,
            gate,
            feed,
            sentiment,
        }
    }

    /// Creates a new AppState from configuration on the given clock.
    pub fn from_config(
        config: &Config,
        clock: Arc<dyn Clock>,
        feed_upstream: Arc<dyn Upstream>,
        sentiment_upstream: Arc<dyn Upstream>,
    ) -> Self {
        let cache = TtlCache::new(config.cache_ttl_ms, clock.clone());
        let gate = RateGate::new(config.cooldown_ms, clock);
        Self::new(
            Arc::new(cache),
            Arc::new(gate),
            (feed_upstream, config.cache_key.as_str()),
            (sentiment_upstream, config.sentiment_key.as_str()),
        )
    }

    /// Creates a new AppState from configuration on the system clock.
    pub fn from_config_with_system_clock(
        config: &Config,
        feed_upstream: Arc<dyn Upstream>,
        sentiment_upstream: Arc<dyn Upstream>,
    ) -> Self {
        Self::from_config(config, Arc::new(SystemClock), feed_upstream, sentiment_upstream)
    }
}

fn served(fetched: Fetched) -> impl IntoResponse {
    (
        [(CACHE_SOURCE_HEADER, fetched.source.as_str())],
        Json(fetched.payload),
    )
}

/// Handler for GET /api/feed
///
/// Serves the item feed through the cache-first read path. Always answers
/// 200; upstream failures degrade to a stale or empty payload.
pub async fn feed_handler(State(state): State<AppState>) -> impl IntoResponse {
    served(state.feed.fetch().await)
}

/// Handler for GET /api/sentiment
///
/// Same read path as the feed, on its own cache slot and upstream but the
/// same rate gate.
pub async fn sentiment_handler(State(state): State<AppState>) -> impl IntoResponse {
    served(state.sentiment.fetch().await)
}

/// Handler for GET /cache/:key
///
/// Reads a cache slot directly. Expired entries are evicted by the read.
pub async fn get_entry_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<EntryResponse>> {
    validate_key(&key)?;

    let value = state
        .cache
        .get(&key)
        .ok_or_else(|| ApiError::NotFound(key.clone()))?;

    Ok(Json(EntryResponse::new(key, value)))
}

/// Handler for DELETE /cache/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    validate_key(&key)?;

    if !state.cache.delete(&key) {
        return Err(ApiError::NotFound(key));
    }

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /stats
///
/// Returns current cache and rate gate statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.cache.stats(),
        state.cache.ttl_ms(),
        state.gate.stats(),
        state.gate.cooldown_ms(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(ApiError::InvalidRequest("Key cannot be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::fetch::{Source, UpstreamError};
    use async_trait::async_trait;
    use serde_json::json;

    struct FixedUpstream(Value);

    #[async_trait]
    impl Upstream for FixedUpstream {
        async fn fetch(&self) -> std::result::Result<Value, UpstreamError> {
            Ok(self.0.clone())
        }
    }

    fn test_state() -> AppState {
        let clock = ManualClock::new(0);
        AppState::from_config(
            &Config::default(),
            Arc::new(clock),
            Arc::new(FixedUpstream(json!({ "items": ["a"] }))),
            Arc::new(FixedUpstream(json!({ "twitter": { "posts": ["p"] } }))),
        )
    }

    #[tokio::test]
    async fn test_feed_then_get_entry() {
        let state = test_state();

        feed_handler(State(state.clone())).await;

        let response = get_entry_handler(State(state), Path("twitter_sentiment".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, json!({ "items": ["a"] }));
    }

    #[tokio::test]
    async fn test_feeds_share_one_gate() {
        let state = test_state();

        let feed = state.feed.fetch().await;
        let sentiment = state.sentiment.fetch().await;

        assert_eq!(feed.source, Source::Upstream);
        assert_eq!(sentiment.source, Source::Default);
        assert_eq!(state.gate.stats().granted, 1);
        assert!(state.cache.get("sentiment_data").is_none());
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let state = test_state();

        let result = get_entry_handler(State(state), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_blank_key_is_invalid() {
        let state = test_state();

        let result = get_entry_handler(State(state), Path("  ".to_string())).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = test_state();
        state.cache.set("to_delete", json!("value"));

        let result = delete_handler(State(state.clone()), Path("to_delete".to_string())).await;
        assert!(result.is_ok());

        let result = delete_handler(State(state), Path("to_delete".to_string())).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();

        let response = stats_handler(State(state)).await;
        assert_eq!(response.hits, 0);
        assert_eq!(response.misses, 0);
        assert_eq!(response.ttl_ms, 3_600_000);
        assert_eq!(response.cooldown_ms, 60_000);
        assert_eq!(response.gate.granted, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
