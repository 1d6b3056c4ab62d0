//! OpenAI-compatible chat completion types

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, RelayRequest};

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMessageRole {
    System,
    Developer,
    User,
    Assistant,
    Tool,
    Function,
}

/// Content part for multimodal messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

/// Image URL content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A chat message in OpenAI format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatMessageRole,

    /// Text content or array of content parts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Message content - can be text or array of content parts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Get the text content, concatenating text parts with newlines
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Chat completion request (OpenAI format)
///
/// Fields the gateway does not act on (`top_p`, `stop`, `user`, ...) are
/// accepted and ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default)]
    pub model: String,

    #[serde(default)]
    pub messages: Vec<ChatMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// The gateway always streams; the flag is accepted for compatibility
    #[serde(default)]
    pub stream: bool,
}

impl ChatCompletionRequest {
    /// Validate and flatten into a relay request
    pub fn into_relay_request(self) -> Result<RelayRequest, DomainError> {
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(DomainError::validation("temperature must be between 0 and 2"));
            }
        }

        RelayRequest::from_messages(
            self.model,
            self.messages
                .iter()
                .map(|m| m.content.as_ref().map(MessageContent::to_text).unwrap_or_default()),
            self.temperature,
            self.max_tokens,
        )
    }
}

/// Reason for completion finish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
}

/// Delta content for streaming
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeltaContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<ChatMessageRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// A choice in a streaming response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionStreamChoice {
    pub index: u32,
    pub delta: DeltaContent,
    pub finish_reason: Option<FinishReason>,
}

/// Streaming chat completion response chunk
///
/// Ids and timestamps are generated per frame and do not match upstream ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionStreamResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatCompletionStreamChoice>,
}

impl ChatCompletionStreamResponse {
    fn frame(model: &str, delta: DeltaContent, finish_reason: Option<FinishReason>) -> Self {
        let now = Utc::now();

        Self {
            id: format!("chatcmpl-{}", now.timestamp_nanos_opt().unwrap_or_default()),
            object: "chat.completion.chunk".to_string(),
            created: now.timestamp(),
            model: model.to_string(),
            choices: vec![ChatCompletionStreamChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        }
    }

    /// Create a content chunk
    pub fn content(model: &str, content: &str) -> Self {
        Self::frame(
            model,
            DeltaContent {
                role: None,
                content: Some(content.to_string()),
            },
            None,
        )
    }

    /// Create a final chunk with finish reason
    pub fn finish(model: &str) -> Self {
        Self::frame(model, DeltaContent::default(), Some(FinishReason::Stop))
    }
}
