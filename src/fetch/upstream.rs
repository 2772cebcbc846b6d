//! Upstream Collaborator
//!
//! The seam between the cache layer and whatever produces fresh payloads.

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

// == Upstream Error ==
/// Failures an upstream fetch can report.
///
/// These never leave the fetch layer; [`super::CachedFetcher`] logs them and
/// degrades to a fallback payload.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// Transport, timeout or body decoding failure
    #[error("Upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("Upstream returned status {0}")]
    Status(u16),

    /// Upstream could not be reached or refused to answer
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),
}

// == Upstream Trait ==
/// Source of fresh payloads for the cache.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Fetches a fresh payload. Owns its own timeout policy.
    async fn fetch(&self) -> Result<Value, UpstreamError>;

    /// Payload served when neither cache nor upstream can answer.
    fn empty_payload(&self) -> Value {
        empty_payload()
    }
}

/// An empty result stamped with the current time.
pub fn empty_payload() -> Value {
    json!({
        "items": [],
        "count": 0,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })
}
