//! Semantic cache domain models and traits
//!
//! Answers are keyed by the embedding of the prompt that produced them, so a
//! lookup matches semantically equivalent prompts rather than exact keys.

mod config;
mod repository;

pub use config::{CacheMode, SemanticCacheConfig};
pub use repository::{CacheLookupResult, CacheRecord, SemanticCache};

#[cfg(test)]
pub use repository::mock::RecordingSemanticCache;
