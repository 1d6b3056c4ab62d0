//! Completion provider domain models and traits

mod chunk;
mod provider;
mod stream;

pub use chunk::{CompletionChunk, CompletionRequest};
pub use provider::CompletionProvider;
pub use stream::{ChunkSender, CompletionStream, DEFAULT_STREAM_BUFFER};

#[cfg(test)]
pub use provider::mock::MockCompletionProvider;
