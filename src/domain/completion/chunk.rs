use serde::{Deserialize, Serialize};

/// Request sent to the upstream completion provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// One incremental piece of an upstream answer.
///
/// `done` chunks are terminal and carry the final token total; chunks with an
/// `error` end the stream early.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionChunk {
    pub content: String,
    pub done: bool,
    pub token_usage: u32,
    pub error: Option<String>,
}

impl CompletionChunk {
    /// An incremental content chunk
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// The terminal chunk
    pub fn done(token_usage: u32) -> Self {
        Self {
            done: true,
            token_usage,
            ..Default::default()
        }
    }

    /// An in-band upstream failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_constructors() {
        let content = CompletionChunk::content("Hel");
        assert_eq!(content.content, "Hel");
        assert!(!content.done);
        assert!(!content.is_error());

        let done = CompletionChunk::done(7);
        assert!(done.done);
        assert_eq!(done.token_usage, 7);

        let failed = CompletionChunk::failed("connection reset");
        assert!(failed.is_error());
        assert!(!failed.done);
    }

    #[test]
    fn test_request_builder() {
        let request = CompletionRequest::new("gpt-4o", "hi")
            .with_temperature(0.2)
            .with_max_tokens(64);

        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.max_tokens, Some(64));
    }

    #[test]
    fn test_request_serialization_skips_unset_options() {
        let json = serde_json::to_string(&CompletionRequest::new("m", "p")).unwrap();

        assert!(!json.contains("temperature"));
        assert!(!json.contains("max_tokens"));
    }
}
