//! Search Cache - a rate-limited TTL response cache
//!
//! Serves a search feed from cache, calling the upstream at most once per
//! cooldown window.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use search_cache::api::{create_router, AppState};
use search_cache::fetch::HttpUpstream;
use search_cache::Config;

/// Main entry point for the cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the upstream clients, cache, rate gate and fetchers
/// 4. Create Axum router with all endpoints
/// 5. Start HTTP server on configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "search_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting search cache server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: ttl={}ms, cooldown={}ms, keys={}/{}, port={}, upstream={}",
        config.cache_ttl_ms,
        config.cooldown_ms,
        config.cache_key,
        config.sentiment_key,
        config.server_port,
        config.upstream_url
    );
    if config.bearer_token.is_none() {
        info!("No UPSTREAM_BEARER_TOKEN set, upstream calls are unauthenticated");
    }

    let feed = HttpUpstream::from_config(&config).context("building feed upstream client")?;
    let sentiment =
        HttpUpstream::posts_from_config(&config).context("building sentiment upstream client")?;
    let state =
        AppState::from_config_with_system_clock(&config, Arc::new(feed), Arc::new(sentiment));
    info!("Cache and rate gate initialized");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
