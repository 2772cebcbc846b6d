//! API Module
//!
//! HTTP handlers and routing for the cache service.
//!
//! # Endpoints
//! - `GET /api/feed` - Cached, rate-limited feed
//! - `GET /api/sentiment` - Cached posts feed on the same rate gate
//! - `GET /cache/:key` - Read a cache slot
//! - `DELETE /cache/:key` - Drop a cache slot
//! - `GET /stats` - Cache and rate gate statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
