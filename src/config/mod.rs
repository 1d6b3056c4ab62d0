//! Application configuration

mod app_config;

pub use app_config::{
    resolve_api_key, AppConfig, CacheServiceConfig, CompletionConfig, EmbeddingConfig, LogFormat,
    LoggingConfig, RelayConfig, ServerConfig, VectorStoreConfig, VectorStoreKind,
};
