//! Wire types for the cache service endpoints

use serde::{Deserialize, Serialize};

/// Body of `POST /v1/cache/lookup`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupRequest {
    pub prompt: String,
    pub model: String,
}

/// Body returned by `POST /v1/cache/record`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RecordResponse {
    pub accepted: bool,
}
