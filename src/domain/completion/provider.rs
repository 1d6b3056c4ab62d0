use async_trait::async_trait;
use std::fmt::Debug;

use super::{CompletionRequest, CompletionStream};
use crate::domain::DomainError;

/// Trait for upstream completion providers
#[async_trait]
pub trait CompletionProvider: Send + Sync + Debug {
    /// Open an incremental token stream.
    ///
    /// Failing to reach the upstream is an `Err`; anything that goes wrong
    /// after the stream is open is delivered in-band as an error chunk.
    async fn stream(&self, request: CompletionRequest) -> Result<CompletionStream, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::domain::completion::CompletionChunk;
    use std::sync::Mutex;

    /// Provider returning scripted chunks, a hand-driven stream, or an error
    #[derive(Debug, Default)]
    pub struct MockCompletionProvider {
        chunks: Vec<CompletionChunk>,
        stream: Mutex<Option<CompletionStream>>,
        error: Option<String>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockCompletionProvider {
        pub fn new(chunks: Vec<CompletionChunk>) -> Self {
            Self {
                chunks,
                ..Default::default()
            }
        }

        /// Hand out a stream whose producer is driven by the test
        pub fn with_stream(stream: CompletionStream) -> Self {
            Self {
                stream: Mutex::new(Some(stream)),
                ..Default::default()
            }
        }

        pub fn with_error(mut self, error: impl Into<String>) -> Self {
            self.error = Some(error.into());
            self
        }

        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionProvider for MockCompletionProvider {
        async fn stream(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionStream, DomainError> {
            self.requests.lock().unwrap().push(request);

            if let Some(ref error) = self.error {
                return Err(DomainError::provider("mock", error.clone()));
            }

            if let Some(stream) = self.stream.lock().unwrap().take() {
                return Ok(stream);
            }

            Ok(CompletionStream::from_chunks(self.chunks.clone()))
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }
    }
}
