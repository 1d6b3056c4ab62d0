//! CLI module for the semantic gateway
//!
//! Provides subcommands for running the two processes:
//! - `serve`: the chat completions gateway
//! - `cache`: the semantic cache engine as a standalone service

pub mod cache;
pub mod serve;

use std::future::Future;
use std::net::{IpAddr, SocketAddr};

use axum::Router;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use crate::api::MetricsEndpoint;
use crate::config::AppConfig;
use crate::domain::SemanticCache;
use crate::infrastructure::observability::{init_metrics, init_tracing, shutdown_tracing};

/// Semantic LLM Gateway - streaming completions behind a semantic cache
#[derive(Parser)]
#[command(name = "semantic-llm-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the chat completions gateway
    Serve,

    /// Run the semantic cache engine as a standalone service
    Cache,
}

/// Load `.env` and the layered configuration, then set up logging
fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(&config.logging, &config.observability.tracing);
    config.validate()?;

    Ok(config)
}

fn metrics_endpoint(config: &AppConfig) -> Option<MetricsEndpoint> {
    init_metrics(&config.observability.metrics).map(|metrics| MetricsEndpoint {
        metrics,
        path: config.observability.metrics.path.clone(),
    })
}

fn socket_addr(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    Ok(SocketAddr::from((host.parse::<IpAddr>()?, port)))
}

/// Serve `app` until `signal` resolves, then stop `cache` and flush tracing.
///
/// The cache is stopped even when the server fails, so queued writes are
/// drained before the error is returned.
async fn serve_then_stop<F>(
    listener: TcpListener,
    app: Router,
    signal: F,
    cache: &dyn SemanticCache,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .await;

    cache.shutdown().await;
    shutdown_tracing();

    Ok(served?)
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
