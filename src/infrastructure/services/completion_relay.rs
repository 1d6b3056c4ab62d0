//! Streaming completion relay
//!
//! Serves one chat request: looks the prompt up in the semantic cache, then
//! either replays the cached answer or forwards the upstream token stream,
//! reconstructing the answer so it can be written back to the cache.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::relay::split_runes;
use crate::domain::{
    CacheRecord, CompletionProvider, CompletionStream, DomainError, PartialWriteBack,
    RelayOutcome, RelayRequest, RelaySource, RelayTermination, SemanticCache, StreamFrame,
};
use crate::infrastructure::observability::record_relay;

/// Default number of characters per replayed cache frame
pub const DEFAULT_REPLAY_CHUNK_SIZE: usize = 20;

const DIALOG_PREVIEW_CHARS: usize = 100;

/// Where a prepared relay will take its answer from
#[derive(Debug)]
enum AnswerSource {
    Cached(String),
    Upstream(CompletionStream),
}

/// A request whose answer source has been resolved.
///
/// Everything that can fail with a client-visible error has already
/// happened; running it only produces frames.
#[derive(Debug)]
pub struct PreparedRelay {
    request: RelayRequest,
    source: AnswerSource,
}

impl PreparedRelay {
    pub fn request(&self) -> &RelayRequest {
        &self.request
    }

    pub fn source(&self) -> RelaySource {
        match self.source {
            AnswerSource::Cached(_) => RelaySource::Cache,
            AnswerSource::Upstream(_) => RelaySource::Upstream,
        }
    }
}

#[derive(Debug)]
pub struct CompletionRelay {
    cache: Arc<dyn SemanticCache>,
    completion: Arc<dyn CompletionProvider>,
    replay_chunk_size: usize,
    partial_write_back: PartialWriteBack,
}

impl CompletionRelay {
    pub fn new(cache: Arc<dyn SemanticCache>, completion: Arc<dyn CompletionProvider>) -> Self {
        Self {
            cache,
            completion,
            replay_chunk_size: DEFAULT_REPLAY_CHUNK_SIZE,
            partial_write_back: PartialWriteBack::default(),
        }
    }

    pub fn with_replay_chunk_size(mut self, size: usize) -> Self {
        self.replay_chunk_size = size.max(1);
        self
    }

    pub fn with_partial_write_back(mut self, policy: PartialWriteBack) -> Self {
        self.partial_write_back = policy;
        self
    }

    /// Resolve the answer source: a cache hit, or an open upstream stream.
    ///
    /// A failed lookup is treated as a miss. Only failing to open the
    /// upstream stream is an error.
    pub async fn prepare(&self, request: RelayRequest) -> Result<PreparedRelay, DomainError> {
        match self.cache.lookup(&request.prompt, &request.model).await {
            Ok(result) if result.hit => {
                debug!(model = %request.model, "Semantic cache hit");
                return Ok(PreparedRelay {
                    request,
                    source: AnswerSource::Cached(result.answer),
                });
            }
            Ok(_) => debug!(model = %request.model, "Semantic cache miss"),
            Err(e) => {
                warn!(model = %request.model, error = %e, "Semantic cache lookup failed, treating as miss")
            }
        }

        let stream = self
            .completion
            .stream(request.to_completion_request())
            .await
            .inspect_err(|e| {
                warn!(
                    model = %request.model,
                    provider = self.completion.provider_name(),
                    error = %e,
                    "Failed to open upstream stream"
                )
            })?;

        Ok(PreparedRelay {
            request,
            source: AnswerSource::Upstream(stream),
        })
    }

    /// Emit the frames of a prepared relay in order until the answer is
    /// complete, upstream fails, or `cancel` fires.
    ///
    /// A closed `frames` receiver is treated like cancellation.
    pub async fn run(
        &self,
        prepared: PreparedRelay,
        frames: mpsc::Sender<StreamFrame>,
        cancel: CancellationToken,
    ) -> RelayOutcome {
        let PreparedRelay { request, source } = prepared;

        let outcome = match source {
            AnswerSource::Cached(answer) => self.replay(answer, &frames, &cancel).await,
            AnswerSource::Upstream(stream) => {
                self.relay_upstream(&request, stream, &frames, &cancel).await
            }
        };

        record_relay(
            outcome.source.as_str(),
            outcome.termination.as_str(),
            outcome.token_usage,
        );
        debug!(
            model = %request.model,
            source = outcome.source.as_str(),
            termination = outcome.termination.as_str(),
            prompt_tail = %tail(&request.prompt, DIALOG_PREVIEW_CHARS),
            answer_head = %head(&outcome.answer, DIALOG_PREVIEW_CHARS),
            "Dialog"
        );

        outcome
    }

    async fn replay(
        &self,
        answer: String,
        frames: &mpsc::Sender<StreamFrame>,
        cancel: &CancellationToken,
    ) -> RelayOutcome {
        let mut delivered = String::with_capacity(answer.len());
        let mut termination = RelayTermination::Completed;

        for piece in split_runes(&answer, self.replay_chunk_size) {
            if !emit(frames, cancel, StreamFrame::Delta(piece.clone())).await {
                termination = RelayTermination::ClientDisconnected;
                break;
            }
            delivered.push_str(&piece);
        }

        if termination == RelayTermination::Completed
            && !(emit(frames, cancel, StreamFrame::Finish).await
                && emit(frames, cancel, StreamFrame::Done).await)
        {
            termination = RelayTermination::ClientDisconnected;
        }

        RelayOutcome {
            source: RelaySource::Cache,
            termination,
            answer: delivered,
            token_usage: 0,
            write_back: false,
        }
    }

    async fn relay_upstream(
        &self,
        request: &RelayRequest,
        mut stream: CompletionStream,
        frames: &mpsc::Sender<StreamFrame>,
        cancel: &CancellationToken,
    ) -> RelayOutcome {
        let mut answer = String::new();
        let mut token_usage = 0;

        let termination = loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => break RelayTermination::ClientDisconnected,
                chunk = stream.next() => chunk,
            };

            let Some(chunk) = chunk else {
                break RelayTermination::UpstreamError(
                    "upstream stream ended without a terminal chunk".to_string(),
                );
            };

            if let Some(error) = chunk.error {
                break RelayTermination::UpstreamError(error);
            }

            if !chunk.content.is_empty() {
                if !emit(frames, cancel, StreamFrame::Delta(chunk.content.clone())).await {
                    break RelayTermination::ClientDisconnected;
                }
                answer.push_str(&chunk.content);
            }

            if chunk.done {
                token_usage = chunk.token_usage;
                // The answer is complete even if the client leaves now
                if !(emit(frames, cancel, StreamFrame::Finish).await
                    && emit(frames, cancel, StreamFrame::Done).await)
                {
                    debug!(model = %request.model, "Client left before the end of stream");
                }
                break RelayTermination::Completed;
            }
        };

        // Stops the upstream producer if it is still running
        drop(stream);

        if let RelayTermination::UpstreamError(ref error) = termination {
            warn!(model = %request.model, error = %error, "Upstream stream truncated");
        }

        let write_back = self.write_back(request, &answer, token_usage, &termination);

        RelayOutcome {
            source: RelaySource::Upstream,
            termination,
            answer,
            token_usage,
            write_back,
        }
    }

    /// Hand the answer to the cache on a detached task
    fn write_back(
        &self,
        request: &RelayRequest,
        answer: &str,
        token_usage: u32,
        termination: &RelayTermination,
    ) -> bool {
        if answer.is_empty() || !self.partial_write_back.allows(termination) {
            return false;
        }

        let record = CacheRecord::new(
            request.prompt.clone(),
            answer,
            request.model.clone(),
            token_usage,
        );
        let cache = self.cache.clone();

        tokio::spawn(async move {
            let model = record.model.clone();
            if cache.record(record).await {
                debug!(model = %model, "Cache write-back queued");
            } else {
                warn!(model = %model, "Cache write-back dropped");
            }
        });

        true
    }
}

/// Send one frame unless the client is gone. Returns `false` on disconnect.
async fn emit(
    frames: &mpsc::Sender<StreamFrame>,
    cancel: &CancellationToken,
    frame: StreamFrame,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = frames.send(frame) => sent.is_ok(),
    }
}

fn head(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn tail(text: &str, max: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(max)).collect()
}
