//! Semantic cache trait and types

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// A completed answer to be stored in the semantic cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Prompt that produced the answer
    pub prompt: String,
    /// Full answer text
    pub response: String,
    /// Model that generated the answer
    pub model: String,
    /// Total tokens reported by the upstream, 0 when unknown
    #[serde(default)]
    pub token_usage: u32,
}

impl CacheRecord {
    pub fn new(
        prompt: impl Into<String>,
        response: impl Into<String>,
        model: impl Into<String>,
        token_usage: u32,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            response: response.into(),
            model: model.into(),
            token_usage,
        }
    }
}

/// Outcome of a cache lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheLookupResult {
    pub hit: bool,
    /// Cached answer; empty on a miss
    #[serde(default)]
    pub answer: String,
}

impl CacheLookupResult {
    pub fn hit(answer: impl Into<String>) -> Self {
        Self {
            hit: true,
            answer: answer.into(),
        }
    }

    pub fn miss() -> Self {
        Self::default()
    }
}

/// Trait for semantic cache implementations
#[async_trait]
pub trait SemanticCache: Send + Sync + Debug {
    /// Find a previously stored answer for a semantically similar prompt
    /// generated by the same model.
    async fn lookup(&self, prompt: &str, model: &str) -> Result<CacheLookupResult, DomainError>;

    /// Enqueue an answer for asynchronous storage.
    ///
    /// Never blocks: returns `false` when the record was dropped because the
    /// write queue is full or the cache is shutting down.
    async fn record(&self, record: CacheRecord) -> bool;

    /// Stop accepting records and wait for queued ones to be processed
    async fn shutdown(&self);
}
