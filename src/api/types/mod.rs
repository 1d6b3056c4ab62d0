//! OpenAI-compatible API types
//!
//! These types mirror the OpenAI API format for compatibility.

pub mod cache;
pub mod chat;
pub mod error;
pub mod json;

pub use cache::{LookupRequest, RecordResponse};
pub use chat::{
    ChatCompletionRequest, ChatCompletionStreamChoice, ChatCompletionStreamResponse, ChatMessage,
    ChatMessageRole, ContentPart, DeltaContent, FinishReason, MessageContent,
};
pub use error::{ApiError, ApiErrorResponse, ApiErrorType};
pub use json::Json;
