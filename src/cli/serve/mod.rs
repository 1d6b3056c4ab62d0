//! Serve command - runs the chat completions gateway

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use super::{bootstrap, metrics_endpoint, serve_then_stop, shutdown_signal, socket_addr};
use crate::api::{create_router, AppState};
use crate::{build_completion_provider, build_relay, build_semantic_cache};

/// Run the gateway until SIGINT/SIGTERM, then stop the cache engine
pub async fn run() -> anyhow::Result<()> {
    let config = bootstrap()?;

    let cache = build_semantic_cache(&config).await?;
    let completion = build_completion_provider(&config.completion)?;
    let relay = build_relay(&config, cache.clone(), completion);

    let state = AppState::new(Arc::new(relay)).with_mock(config.relay.allow_mock);
    let app = create_router(state, metrics_endpoint(&config));

    let addr = socket_addr(&config.server.host, config.server.port)?;
    info!(
        %addr,
        cache_mode = ?config.semantic_cache.mode,
        "Starting gateway"
    );

    let listener = TcpListener::bind(addr).await?;
    serve_then_stop(listener, app, shutdown_signal(), cache.as_ref()).await?;
    info!("Gateway shutdown complete");

    Ok(())
}
