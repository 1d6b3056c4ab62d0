//! Domain layer - Core business logic and entities

pub mod completion;
pub mod embedding;
pub mod error;
pub mod relay;
pub mod semantic_cache;
pub mod vector_store;

pub use completion::{
    ChunkSender, CompletionChunk, CompletionProvider, CompletionRequest, CompletionStream,
};
pub use embedding::{cosine_similarity, EmbeddingProvider};
pub use error::DomainError;
pub use relay::{
    PartialWriteBack, RelayOutcome, RelayRequest, RelaySource, RelayTermination, StreamFrame,
};
pub use semantic_cache::{
    CacheLookupResult, CacheMode, CacheRecord, SemanticCache, SemanticCacheConfig,
};
pub use vector_store::{
    ensure_collection, CollectionSpec, PayloadFilter, ScoredPoint, VectorPoint, VectorQuery,
    VectorStore,
};
