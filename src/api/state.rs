//! Shared state handed to the HTTP handlers

use std::sync::Arc;

use crate::domain::SemanticCache;
use crate::infrastructure::services::CompletionRelay;

/// Gateway state: everything a chat request needs
#[derive(Debug, Clone)]
pub struct AppState {
    pub relay: Arc<CompletionRelay>,
    /// Honour the `x-mock` load-testing header
    pub allow_mock: bool,
}

impl AppState {
    pub fn new(relay: Arc<CompletionRelay>) -> Self {
        Self {
            relay,
            allow_mock: false,
        }
    }

    pub fn with_mock(mut self, allow_mock: bool) -> Self {
        self.allow_mock = allow_mock;
        self
    }
}

/// State of the standalone cache service
#[derive(Debug, Clone)]
pub struct CacheServiceState {
    pub cache: Arc<dyn SemanticCache>,
}

impl CacheServiceState {
    pub fn new(cache: Arc<dyn SemanticCache>) -> Self {
        Self { cache }
    }
}
