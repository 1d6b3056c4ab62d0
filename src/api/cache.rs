//! Network endpoints of the standalone cache service
//!
//! A thin shim over [`SemanticCache`] so the engine can run in its own
//! process; `RemoteSemanticCache` is the matching client.

use axum::{extract::State, routing::post, Router};
use tracing::warn;

use crate::api::state::CacheServiceState;
use crate::api::types::{ApiError, Json, LookupRequest, RecordResponse};
use crate::domain::{CacheLookupResult, CacheRecord};

/// Create the cache service router
pub fn create_cache_router() -> Router<CacheServiceState> {
    Router::new()
        .route("/v1/cache/lookup", post(lookup))
        .route("/v1/cache/record", post(record))
}

/// POST /v1/cache/lookup
///
/// A failed lookup is reported as 503 so callers can tell "cache
/// unavailable" apart from a miss.
async fn lookup(
    State(state): State<CacheServiceState>,
    Json(request): Json<LookupRequest>,
) -> Result<Json<CacheLookupResult>, ApiError> {
    state
        .cache
        .lookup(&request.prompt, &request.model)
        .await
        .map(Json)
        .map_err(|e| {
            warn!(model = %request.model, error = %e, "Cache lookup failed");
            ApiError::unavailable(e.to_string())
        })
}

/// POST /v1/cache/record
async fn record(
    State(state): State<CacheServiceState>,
    Json(record): Json<CacheRecord>,
) -> Json<RecordResponse> {
    let accepted = state.cache.record(record).await;
    Json(RecordResponse { accepted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::router::create_cache_service_router;
    use crate::domain::semantic_cache::RecordingSemanticCache;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_lookup_hit() {
        let cache = Arc::new(RecordingSemanticCache::with_answer("Paris"));
        let app = create_cache_service_router(CacheServiceState::new(cache), None);

        let response = app
            .oneshot(post(
                "/v1/cache/lookup",
                json!({"prompt": "capital of France?", "model": "gpt-4o"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"hit": true, "answer": "Paris"}));
    }

    #[tokio::test]
    async fn test_lookup_miss() {
        let cache = Arc::new(RecordingSemanticCache::new());
        let app = create_cache_service_router(CacheServiceState::new(cache), None);

        let response = app
            .oneshot(post("/v1/cache/lookup", json!({"prompt": "q", "model": "m"})))
            .await
            .unwrap();

        assert_eq!(json_body(response).await["hit"], json!(false));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_unavailable() {
        let cache = Arc::new(RecordingSemanticCache::failing("qdrant down"));
        let app = create_cache_service_router(CacheServiceState::new(cache), None);

        let response = app
            .oneshot(post("/v1/cache/lookup", json!({"prompt": "q", "model": "m"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["error"]["type"], "service_unavailable_error");
    }

    #[tokio::test]
    async fn test_record_is_forwarded_to_engine() {
        let cache = Arc::new(RecordingSemanticCache::new());
        let app = create_cache_service_router(CacheServiceState::new(cache.clone()), None);

        let response = app
            .oneshot(post(
                "/v1/cache/record",
                json!({"prompt": "q", "response": "a", "model": "m", "token_usage": 9}),
            ))
            .await
            .unwrap();

        assert_eq!(json_body(response).await, json!({"accepted": true}));
        assert_eq!(cache.records(), vec![CacheRecord::new("q", "a", "m", 9)]);
    }

    #[tokio::test]
    async fn test_record_rejects_malformed_body() {
        let cache = Arc::new(RecordingSemanticCache::new());
        let app = create_cache_service_router(CacheServiceState::new(cache.clone()), None);

        let response = app
            .oneshot(post("/v1/cache/record", json!({"prompt": "q"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(cache.records().is_empty());
    }
}
