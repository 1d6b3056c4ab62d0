//! Semantic LLM Gateway
//!
//! An OpenAI-compatible streaming gateway that answers semantically
//! equivalent prompts from a vector-similarity cache:
//! - Cache hits are replayed as a synthetic token stream
//! - Misses are relayed live from the upstream provider and written back
//!   to the cache in the background
//! - The cache engine can run in-process or as a separate service

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use config::{
    resolve_api_key, CompletionConfig, EmbeddingConfig, VectorStoreConfig, VectorStoreKind,
};
use domain::{
    CacheMode, CompletionProvider, DomainError, EmbeddingProvider, SemanticCache, VectorStore,
};
use infrastructure::{
    completion::OpenAiCompletionProvider,
    embedding::OpenAiEmbeddingProvider,
    llm::HttpClient,
    semantic_cache::{RemoteSemanticCache, SemanticCacheEngine},
    services::CompletionRelay,
    vector_store::{InMemoryVectorStore, QdrantVectorStore},
};
use tracing::info;

/// Create the vector store backend selected by `vector_store.kind`
pub fn build_vector_store(config: &VectorStoreConfig) -> Result<Arc<dyn VectorStore>, DomainError> {
    match config.kind {
        VectorStoreKind::Memory => {
            info!("Using in-memory vector store");
            Ok(Arc::new(InMemoryVectorStore::new()))
        }
        VectorStoreKind::Qdrant => {
            let api_key = config
                .api_key_env
                .as_deref()
                .map(resolve_api_key)
                .transpose()?;

            info!(url = %config.url, "Using Qdrant vector store");
            Ok(Arc::new(QdrantVectorStore::connect(&config.url, api_key)?))
        }
    }
}

/// Create the OpenAI embedding provider
pub fn build_embedding_provider(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, DomainError> {
    let api_key = resolve_api_key(&config.api_key_env)?;
    let client = HttpClient::with_timeout("openai", Duration::from_secs(config.timeout_secs))?;

    Ok(Arc::new(OpenAiEmbeddingProvider::with_base_url(
        client,
        api_key,
        &config.model,
        config.dimensions,
        &config.base_url,
    )))
}

/// Create the upstream completion provider
pub fn build_completion_provider(
    config: &CompletionConfig,
) -> Result<Arc<dyn CompletionProvider>, DomainError> {
    let api_key = resolve_api_key(&config.api_key_env)?;
    let client = HttpClient::with_timeout("openai", Duration::from_secs(config.timeout_secs))?;

    Ok(Arc::new(OpenAiCompletionProvider::with_base_url(
        client,
        api_key,
        &config.base_url,
    )))
}

/// Bootstrap the collection and start the in-process cache engine
pub async fn start_cache_engine(config: &AppConfig) -> Result<Arc<SemanticCacheEngine>, DomainError> {
    let store = build_vector_store(&config.vector_store)?;
    let embedder = build_embedding_provider(&config.embedding)?;

    let engine =
        SemanticCacheEngine::start(config.semantic_cache.clone(), embedder, store).await?;

    Ok(Arc::new(engine))
}

/// The semantic cache the gateway talks to, local or remote per `semantic_cache.mode`
pub async fn build_semantic_cache(config: &AppConfig) -> Result<Arc<dyn SemanticCache>, DomainError> {
    match config.semantic_cache.mode {
        CacheMode::Local => {
            let engine: Arc<dyn SemanticCache> = start_cache_engine(config).await?;
            Ok(engine)
        }
        CacheMode::Remote => {
            info!(url = %config.semantic_cache.remote_url, "Using remote semantic cache");
            let client = HttpClient::with_timeout(
                "cache",
                Duration::from_secs(config.semantic_cache.remote_timeout_secs),
            )?;

            Ok(Arc::new(RemoteSemanticCache::new(
                client,
                &config.semantic_cache.remote_url,
            )))
        }
    }
}

/// Wire the relay from its cache and upstream provider
pub fn build_relay(
    config: &AppConfig,
    cache: Arc<dyn SemanticCache>,
    completion: Arc<dyn CompletionProvider>,
) -> CompletionRelay {
    CompletionRelay::new(cache, completion)
        .with_replay_chunk_size(config.relay.replay_chunk_size)
        .with_partial_write_back(config.relay.partial_write_back)
}
