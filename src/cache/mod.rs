//! Cache Module
//!
//! Provides an in-memory cache with fixed-TTL, read-triggered expiration.

mod entry;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use stats::CacheStats;
pub use store::TtlCache;

// == Public Constants ==
/// Default freshness window: one hour
pub const DEFAULT_TTL_MS: u64 = 3_600_000;
