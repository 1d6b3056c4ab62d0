//! Prometheus metrics infrastructure

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use regex::Regex;

use super::config::MetricsConfig;

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("semantic_gateway_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);

            tracing::info!("Prometheus metrics initialized at {}", config.path);

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record an HTTP request metric
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// Result of a semantic cache lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupResult {
    Hit,
    Miss,
    Error,
}

impl LookupResult {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Error => "error",
        }
    }
}

pub fn record_cache_lookup(result: LookupResult, duration: Duration) {
    let labels = [("result", result.as_str())];

    counter!("semantic_cache_lookups_total", &labels).increment(1);
    histogram!("semantic_cache_lookup_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Whether a record made it into the write queue
pub fn record_cache_enqueue(accepted: bool) {
    let result = if accepted { "accepted" } else { "dropped" };
    counter!("semantic_cache_records_total", "result" => result).increment(1);
}

/// Outcome of a background cache write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteResult {
    Stored,
    EmbedError,
    UpsertError,
}

impl WriteResult {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::EmbedError => "embed_error",
            Self::UpsertError => "upsert_error",
        }
    }
}

pub fn record_cache_write(result: WriteResult, duration: Duration) {
    let labels = [("result", result.as_str())];

    counter!("semantic_cache_writes_total", &labels).increment(1);
    histogram!("semantic_cache_write_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Record a finished relay
pub fn record_relay(source: &str, outcome: &str, token_usage: u32) {
    let labels = [("source", source.to_string()), ("outcome", outcome.to_string())];

    counter!("relay_requests_total", &labels).increment(1);

    if token_usage > 0 {
        counter!("relay_tokens_total", "source" => source.to_string())
            .increment(u64::from(token_usage));
    }
}

static UUID_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").ok()
});

static NUMERIC_ID_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"/\d+(/|$)").ok());

/// Sanitize URL path for metric labels (remove IDs, limit cardinality)
fn sanitize_path(path: &str) -> String {
    let mut path = path.to_string();

    if let Some(re) = UUID_RE.as_ref() {
        path = re.replace_all(&path, "{id}").into_owned();
    }

    if let Some(re) = NUMERIC_ID_RE.as_ref() {
        path = re.replace_all(&path, "/{id}$1").into_owned();
    }

    path.chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path_uuid() {
        let path = "/v1/cache/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(sanitize_path(path), "/v1/cache/{id}");
    }

    #[test]
    fn test_sanitize_path_numeric_id() {
        assert_eq!(sanitize_path("/api/users/123/orders"), "/api/users/{id}/orders");
    }

    #[test]
    fn test_sanitize_path_no_id() {
        assert_eq!(sanitize_path("/v1/chat/completions"), "/v1/chat/completions");
    }

    #[test]
    fn test_sanitize_path_truncates_long_paths() {
        let path = "/very/long/path/that/exceeds/the/maximum/allowed/length/for/metrics";
        assert!(sanitize_path(path).len() <= 50);
    }

    #[test]
    fn test_labels() {
        assert_eq!(LookupResult::Hit.as_str(), "hit");
        assert_eq!(WriteResult::EmbedError.as_str(), "embed_error");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_cache_lookup(LookupResult::Miss, Duration::from_millis(3));
        record_cache_enqueue(false);
        record_cache_write(WriteResult::Stored, Duration::from_millis(3));
        record_relay("upstream", "completed", 7);
    }
}
