//! Client for a semantic cache engine hosted by the `cache` service

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{CacheLookupResult, CacheRecord, DomainError, SemanticCache};
use crate::infrastructure::llm::HttpClientTrait;

/// Semantic cache reached over the cache service's JSON endpoints
#[derive(Debug)]
pub struct RemoteSemanticCache<C: HttpClientTrait> {
    client: C,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct LookupRequest<'a> {
    prompt: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct RecordResponse {
    accepted: bool,
}

impl<C: HttpClientTrait> RemoteSemanticCache<C> {
    pub fn new(client: C, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, operation: &str) -> String {
        format!("{}/v1/cache/{}", self.base_url, operation)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![("Content-Type", "application/json")]
    }
}

#[async_trait]
impl<C: HttpClientTrait> SemanticCache for RemoteSemanticCache<C> {
    async fn lookup(&self, prompt: &str, model: &str) -> Result<CacheLookupResult, DomainError> {
        let body = serde_json::to_value(LookupRequest { prompt, model })
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let response = self
            .client
            .post_json(&self.url("lookup"), self.headers(), &body)
            .await
            .map_err(|e| DomainError::cache(format!("Remote lookup failed: {}", e)))?;

        serde_json::from_value(response)
            .map_err(|e| DomainError::cache(format!("Invalid lookup response: {}", e)))
    }

    async fn record(&self, record: CacheRecord) -> bool {
        let body = match serde_json::to_value(&record) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Failed to serialize cache record");
                return false;
            }
        };

        let response = match self
            .client
            .post_json(&self.url("record"), self.headers(), &body)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(model = %record.model, error = %e, "Remote cache record failed");
                return false;
            }
        };

        serde_json::from_value::<RecordResponse>(response)
            .map(|r| r.accepted)
            .unwrap_or(false)
    }

    async fn shutdown(&self) {
        // The engine's lifecycle belongs to the cache service
        debug!(url = %self.base_url, "Detached from remote semantic cache");
    }
}
