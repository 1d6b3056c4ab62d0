//! Cache command - hosts the semantic cache engine for remote gateways

use tokio::net::TcpListener;
use tracing::info;

use super::{bootstrap, metrics_endpoint, serve_then_stop, shutdown_signal, socket_addr};
use crate::api::{create_cache_service_router, CacheServiceState};
use crate::start_cache_engine;

/// Run the cache service until SIGINT/SIGTERM, then drain the write queue
pub async fn run() -> anyhow::Result<()> {
    let config = bootstrap()?;

    let engine = start_cache_engine(&config).await?;
    let app = create_cache_service_router(
        CacheServiceState::new(engine.clone()),
        metrics_endpoint(&config),
    );

    let addr = socket_addr(&config.cache_service.host, config.cache_service.port)?;
    info!(
        %addr,
        collection = %config.semantic_cache.collection_name,
        "Starting semantic cache service"
    );

    let listener = TcpListener::bind(addr).await?;
    serve_then_stop(listener, app, shutdown_signal(), engine.as_ref()).await?;
    info!("Semantic cache service shutdown complete");

    Ok(())
}
