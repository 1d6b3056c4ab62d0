//! Completion provider implementations

mod openai;
mod sse;

pub use openai::OpenAiCompletionProvider;
