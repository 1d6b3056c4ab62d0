//! Chat completions endpoint handler

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    http::HeaderMap,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
};
use futures::stream::{self, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::state::AppState;
use crate::api::types::{ApiError, ChatCompletionRequest, ChatCompletionStreamResponse, Json};
use crate::domain::StreamFrame;

const MOCK_HEADER: &str = "x-mock";
const MOCK_FRAMES: usize = 10;
const MOCK_INTERVAL: Duration = Duration::from_millis(10);

/// Frames buffered between the relay and the response body
const FRAME_BUFFER: usize = 1;

/// POST /v1/chat/completions
///
/// Always answers with an SSE stream once the request is accepted. Input
/// errors and an unreachable upstream are reported as JSON errors instead.
pub async fn create_chat_completion(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatCompletionRequest>,
) -> Result<Response, ApiError> {
    if state.allow_mock && is_mock_request(&headers) {
        debug!(model = %request.model, "Serving mock stream");
        return Ok(Sse::new(mock_stream(request.model)).into_response());
    }

    let relay_request = request.into_relay_request()?;

    info!(
        model = %relay_request.model,
        prompt_chars = relay_request.prompt.chars().count(),
        "Processing chat completion request"
    );

    let prepared = state.relay.prepare(relay_request).await?;
    let model = prepared.request().model.clone();

    let (tx, rx) = mpsc::channel(FRAME_BUFFER);
    let cancel = CancellationToken::new();
    // Dropped with the response body when the client goes away
    let disconnect = cancel.clone().drop_guard();

    let relay = state.relay.clone();
    tokio::spawn(async move {
        relay.run(prepared, tx, cancel).await;
    });

    let events = ReceiverStream::new(rx).map(move |frame| {
        let _held = &disconnect;
        Ok::<_, Infallible>(frame_event(&model, &frame))
    });

    Ok(Sse::new(events).into_response())
}

fn is_mock_request(headers: &HeaderMap) -> bool {
    headers
        .get(MOCK_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Render one relay frame as an SSE event
fn frame_event(model: &str, frame: &StreamFrame) -> Event {
    match frame {
        StreamFrame::Delta(content) => json_event(&ChatCompletionStreamResponse::content(model, content)),
        StreamFrame::Finish => json_event(&ChatCompletionStreamResponse::finish(model)),
        StreamFrame::Done => Event::default().data("[DONE]"),
    }
}

fn json_event(chunk: &ChatCompletionStreamResponse) -> Event {
    match serde_json::to_string(chunk) {
        Ok(data) => Event::default().data(data),
        // Plain structs with string and integer fields always serialize
        Err(_) => Event::default().data("{}"),
    }
}

/// Fixed synthetic stream for load testing the front door
fn mock_stream(model: String) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::iter(0..MOCK_FRAMES).then(move |_| {
        let model = model.clone();
        async move {
            tokio::time::sleep(MOCK_INTERVAL).await;
            Ok(frame_event(&model, &StreamFrame::delta("mock")))
        }
    })
}
