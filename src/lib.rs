//! Search Cache - a rate-limited TTL response cache
//!
//! Shields a rate-limited search API behind a fixed-TTL cache and a global,
//! non-blocking rate gate, degrading to stale or empty payloads instead of
//! surfacing upstream failures.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod fetch;
pub mod gate;
pub mod models;

pub use api::AppState;
pub use cache::TtlCache;
pub use config::Config;
pub use fetch::CachedFetcher;
pub use gate::RateGate;
