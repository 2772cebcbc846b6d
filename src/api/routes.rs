//! API Routes
//!
//! Configures the Axum router with all endpoints.

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_handler, feed_handler, get_entry_handler, health_handler, sentiment_handler,
    stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /api/feed` - Cached, rate-limited feed
/// - `GET /api/sentiment` - Cached posts feed on the same rate gate
/// - `GET /cache/:key` - Read a cache slot
/// - `DELETE /cache/:key` - Drop a cache slot
/// - `GET /stats` - Cache and rate gate statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/feed", get(feed_handler))
        .route("/api/sentiment", get(sentiment_handler))
        .route("/cache/:key", get(get_entry_handler).delete(delete_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
