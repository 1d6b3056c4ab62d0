//! Semantic cache configuration

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Where the cache engine runs relative to the gateway
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// Engine runs inside the gateway process
    #[default]
    Local,
    /// Engine runs as a separate service reached over HTTP
    Remote,
}

/// Configuration for semantic caching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticCacheConfig {
    /// Vector store collection holding cached answers
    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// Embedding dimensionality of the collection
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Similarity threshold for cache hits (0.0 to 1.0)
    /// Higher values require more similar queries
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Number of background write workers
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Capacity of the write-behind queue; records beyond it are dropped
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default)]
    pub mode: CacheMode,

    /// Base URL of the cache service when `mode` is remote
    #[serde(default = "default_remote_url")]
    pub remote_url: String,

    /// Upper bound on each call to the cache service
    #[serde(default = "default_remote_timeout_secs")]
    pub remote_timeout_secs: u64,
}

fn default_collection_name() -> String {
    "llm_semantic_cache".to_string()
}

fn default_dimensions() -> usize {
    1536
}

fn default_similarity_threshold() -> f32 {
    0.95
}

fn default_worker_count() -> usize {
    5
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_remote_url() -> String {
    "http://localhost:50052".to_string()
}

fn default_remote_timeout_secs() -> u64 {
    3
}

impl Default for SemanticCacheConfig {
    fn default() -> Self {
        Self {
            collection_name: default_collection_name(),
            dimensions: default_dimensions(),
            similarity_threshold: default_similarity_threshold(),
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            mode: CacheMode::default(),
            remote_url: default_remote_url(),
            remote_timeout_secs: default_remote_timeout_secs(),
        }
    }
}

impl SemanticCacheConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the collection name
    pub fn with_collection_name(mut self, name: impl Into<String>) -> Self {
        self.collection_name = name.into();
        self
    }

    /// Set the embedding dimensions
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Set the similarity threshold
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set the number of write workers
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Set the write queue capacity
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Check invariants that would otherwise fail at runtime
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.collection_name.trim().is_empty() {
            return Err(DomainError::configuration(
                "semantic_cache.collection_name cannot be empty",
            ));
        }

        if self.dimensions == 0 {
            return Err(DomainError::configuration(
                "semantic_cache.dimensions must be at least 1",
            ));
        }

        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(DomainError::configuration(
                "semantic_cache.similarity_threshold must be between 0 and 1",
            ));
        }

        if self.worker_count == 0 {
            return Err(DomainError::configuration(
                "semantic_cache.worker_count must be at least 1",
            ));
        }

        if self.queue_capacity == 0 {
            return Err(DomainError::configuration(
                "semantic_cache.queue_capacity must be at least 1",
            ));
        }

        if self.remote_timeout_secs == 0 {
            return Err(DomainError::configuration(
                "semantic_cache.remote_timeout_secs must be at least 1",
            ));
        }

        Ok(())
    }
}
