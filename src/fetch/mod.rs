//! Fetch Module
//!
//! Upstream collaborators and the cache-first orchestration in front of them.

mod http;
mod orchestrator;
mod upstream;

pub use http::{empty_posts, shape_posts, shape_results, HttpUpstream, Shape};
pub use orchestrator::{CachedFetcher, Fetched, Source};
pub use upstream::{empty_payload, Upstream, UpstreamError};
