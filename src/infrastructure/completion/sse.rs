//! Line-level parsing of an OpenAI-compatible SSE body

use serde::Deserialize;

/// Reassembles lines from arbitrarily split network reads
#[derive(Debug, Default)]
pub(crate) struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    /// Append bytes and return every line completed by them, without the
    /// trailing `\n` / `\r\n`.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Whatever is left once the body has ended
    pub fn finish(self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.pending).trim().to_string();
        (!rest.is_empty()).then_some(rest)
    }
}

/// Meaning of one SSE line
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SseLine {
    /// Blank, comment, or unparseable line
    Skip,
    /// The `[DONE]` sentinel
    Done,
    /// Upstream reported an error inside the stream
    Error(String),
    Data {
        content: Option<String>,
        finished: bool,
        total_tokens: Option<u32>,
    },
}

pub(crate) fn parse_line(line: &str) -> SseLine {
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();

    if data == "[DONE]" {
        return SseLine::Done;
    }

    let Ok(chunk) = serde_json::from_str::<StreamChunk>(data) else {
        return SseLine::Skip;
    };

    if let Some(error) = chunk.error {
        return SseLine::Error(error.message);
    }

    let choice = chunk.choices.into_iter().next();
    let finished = choice
        .as_ref()
        .is_some_and(|c| c.finish_reason.as_deref().is_some_and(|r| !r.is_empty()));
    let content = choice
        .and_then(|c| c.delta.and_then(|d| d.content))
        .filter(|c| !c.is_empty());
    let total_tokens = chunk
        .usage
        .map(|u| u.total_tokens)
        .filter(|total| *total > 0);

    SseLine::Data {
        content,
        finished,
        total_tokens,
    }
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    usage: Option<StreamUsage>,
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Option<StreamDelta>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamUsage {
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    #[serde(default)]
    message: String,
}
