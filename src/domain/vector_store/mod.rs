//! Vector store domain models and traits
//!
//! The cache engine only relies on three capabilities of a vector database:
//! idempotent collection bootstrap, point upsert, and a filtered nearest
//! neighbour query with a score threshold.

mod point;
mod store;

pub use point::{CollectionSpec, Distance, PayloadFilter, ScoredPoint, VectorPoint, VectorQuery};
pub use store::{ensure_collection, VectorStore};
