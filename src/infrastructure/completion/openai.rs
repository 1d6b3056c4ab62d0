use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, warn};

use super::sse::{parse_line, SseLine, SseLineBuffer};
use crate::domain::completion::DEFAULT_STREAM_BUFFER;
use crate::domain::{
    ChunkSender, CompletionProvider, CompletionRequest, CompletionStream, DomainError,
};
use crate::infrastructure::llm::{ByteStream, HttpClientTrait};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Streaming chat completions against an OpenAI-compatible API
#[derive(Debug)]
pub struct OpenAiCompletionProvider<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
}

impl<C: HttpClientTrait> OpenAiCompletionProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let auth_header = format!("Bearer {}", api_key.into());
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            auth_header,
            base_url,
        }
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_request(&self, request: &CompletionRequest) -> serde_json::Value {
        let body = ChatRequest {
            model: &request.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: true,
            stream_options: StreamOptions {
                include_usage: true,
            },
        };

        serde_json::to_value(body).unwrap_or_default()
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
            ("Accept", "text/event-stream"),
        ]
    }
}

#[async_trait]
impl<C: HttpClientTrait> CompletionProvider for OpenAiCompletionProvider<C> {
    async fn stream(&self, request: CompletionRequest) -> Result<CompletionStream, DomainError> {
        let url = self.chat_completions_url();
        let body = self.build_request(&request);

        let bytes = self
            .client
            .post_json_stream(&url, self.headers(), &body)
            .await
            .map_err(|e| match e {
                DomainError::Provider { message, .. } => DomainError::provider("openai", message),
                other => other,
            })?;

        let (tx, stream) = CompletionStream::channel(DEFAULT_STREAM_BUFFER);
        tokio::spawn(pump(bytes, tx, request.model));

        Ok(stream)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Read the upstream body and forward it as chunks until it ends, fails, or
/// the consumer goes away. Dropping `bytes` releases the connection.
async fn pump(mut bytes: ByteStream, tx: ChunkSender, model: String) {
    let mut buffer = SseLineBuffer::default();
    let mut finished = false;
    let mut total_tokens = 0u32;

    loop {
        let item = tokio::select! {
            biased;
            _ = tx.closed() => {
                debug!(model = %model, "Completion consumer dropped, closing upstream");
                return;
            }
            item = bytes.next() => item,
        };

        let lines = match item {
            Some(Ok(data)) => buffer.push(&data),
            Some(Err(e)) => {
                warn!(model = %model, error = %e, "Upstream read failed");
                tx.fail(format!("failed to read from upstream: {}", e)).await;
                return;
            }
            None => break,
        };

        for line in lines {
            match parse_line(&line) {
                SseLine::Skip => {}
                SseLine::Done => {
                    tx.finish(total_tokens).await;
                    return;
                }
                SseLine::Error(message) => {
                    warn!(model = %model, error = %message, "Upstream reported an error");
                    tx.fail(message).await;
                    return;
                }
                SseLine::Data {
                    content,
                    finished: has_finished,
                    total_tokens: usage,
                } => {
                    if let Some(usage) = usage {
                        total_tokens = usage;
                    }
                    finished |= has_finished;
                    if let Some(content) = content {
                        if !tx.content(content).await {
                            return;
                        }
                    }
                }
            }
        }
    }

    // Body ended without a trailing newline
    if let Some(SseLine::Data {
        content,
        total_tokens: usage,
        ..
    }) = buffer.finish().map(|line| parse_line(&line))
    {
        if let Some(usage) = usage {
            total_tokens = usage;
        }
        if let Some(content) = content {
            if !tx.content(content).await {
                return;
            }
        }
    }

    debug!(model = %model, finished, total_tokens, "Upstream body ended");
    tx.finish(total_tokens).await;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
    stream_options: StreamOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}
