//! Semantic cache implementations

mod engine;
mod remote;

pub use engine::SemanticCacheEngine;
pub use remote::RemoteSemanticCache;
