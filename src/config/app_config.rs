use serde::Deserialize;

use crate::domain::{DomainError, PartialWriteBack, SemanticCacheConfig};
use crate::infrastructure::observability::ObservabilityConfig;
use crate::infrastructure::services::DEFAULT_REPLAY_CHUNK_SIZE;

pub use crate::infrastructure::logging::{LogFormat, LoggingConfig};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Application configuration
///
/// Every section has defaults, so an empty environment yields a runnable
/// local setup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub semantic_cache: SemanticCacheConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub cache_service: CacheServiceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Vector store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreKind {
    #[default]
    Qdrant,
    /// Process-local store, contents are lost on restart
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub kind: VectorStoreKind,
    /// Qdrant gRPC endpoint
    #[serde(default = "default_qdrant_url")]
    pub url: String,
    /// Environment variable holding the Qdrant API key, if any
    #[serde(default)]
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Upper bound on a whole streamed answer, 0 for none
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Characters per frame when replaying a cached answer
    #[serde(default = "default_replay_chunk_size")]
    pub replay_chunk_size: usize,
    #[serde(default)]
    pub partial_write_back: PartialWriteBack,
    #[serde(default = "default_true")]
    pub allow_mock: bool,
}

/// Listener of the standalone cache service
#[derive(Debug, Clone, Deserialize)]
pub struct CacheServiceConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_cache_service_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cache_service_port() -> u16 {
    50052
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".to_string()
}

fn default_openai_base_url() -> String {
    DEFAULT_OPENAI_BASE_URL.to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_dimensions() -> usize {
    1536
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_completion_timeout() -> u64 {
    600
}

fn default_replay_chunk_size() -> usize {
    DEFAULT_REPLAY_CHUNK_SIZE
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            kind: VectorStoreKind::default(),
            url: default_qdrant_url(),
            api_key_env: None,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_embedding_model(),
            api_key_env: default_api_key_env(),
            dimensions: default_dimensions(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_completion_timeout(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            replay_chunk_size: default_replay_chunk_size(),
            partial_write_back: PartialWriteBack::default(),
            allow_mock: true,
        }
    }
}

impl Default for CacheServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_cache_service_port(),
        }
    }
}

impl AppConfig {
    /// Load `config/default`, then `config/local`, then `APP__*` variables
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject settings the service cannot start with
    pub fn validate(&self) -> Result<(), DomainError> {
        self.semantic_cache.validate()?;
        self.observability.validate()?;

        if self.embedding.dimensions != self.semantic_cache.dimensions {
            return Err(DomainError::configuration(format!(
                "embedding.dimensions ({}) must match semantic_cache.dimensions ({})",
                self.embedding.dimensions, self.semantic_cache.dimensions
            )));
        }

        if self.relay.replay_chunk_size == 0 {
            return Err(DomainError::configuration(
                "relay.replay_chunk_size must be at least 1",
            ));
        }

        Ok(())
    }
}

/// Read a secret from the named environment variable
pub fn resolve_api_key(env_var: &str) -> Result<String, DomainError> {
    match std::env::var(env_var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(DomainError::configuration(format!(
            "Environment variable {} is not set",
            env_var
        ))),
    }
}
