use std::time::Duration;

use axum::{http::Method, middleware, routing::get, Router};
use tower_http::cors::{AllowHeaders, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::cache;
use super::health;
use super::middleware::{logging_middleware, metrics_middleware};
use super::state::{AppState, CacheServiceState};
use super::v1;
use crate::infrastructure::observability::{create_metrics_router, PrometheusMetrics};

const CORS_MAX_AGE: Duration = Duration::from_secs(86400);

/// Prometheus scrape endpoint to mount next to the API
#[derive(Clone)]
pub struct MetricsEndpoint {
    pub metrics: PrometheusMetrics,
    pub path: String,
}

/// Create the gateway router
pub fn create_router(state: AppState, metrics: Option<MetricsEndpoint>) -> Router {
    let router = health_routes()
        // OpenAI-compatible v1 API
        .nest("/v1", v1::create_v1_router())
        .with_state(state)
        // Preflight requests are answered here and never reach a handler
        .layer(cors_layer());

    finish(router, metrics)
}

/// Create the standalone cache service router
pub fn create_cache_service_router(
    state: CacheServiceState,
    metrics: Option<MetricsEndpoint>,
) -> Router {
    let router = health_routes()
        .merge(cache::create_cache_router())
        .with_state(state);

    finish(router, metrics)
}

fn health_routes<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/live", get(health::live_check))
}

fn finish(router: Router, metrics: Option<MetricsEndpoint>) -> Router {
    let mut router = router
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http());

    if let Some(endpoint) = metrics {
        router = router.merge(create_metrics_router(endpoint.metrics, &endpoint.path));
    }

    router
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .max_age(CORS_MAX_AGE)
}
