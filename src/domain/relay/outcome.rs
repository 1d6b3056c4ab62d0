use serde::{Deserialize, Serialize};

/// Where the answer of a relayed request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaySource {
    Cache,
    Upstream,
}

impl RelaySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Upstream => "upstream",
        }
    }
}

/// How the relay loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayTermination {
    /// Terminal chunk received and `[DONE]` sent
    Completed,
    /// Upstream reported an error or ended without a terminal chunk
    UpstreamError(String),
    /// The client went away before the stream finished
    ClientDisconnected,
}

impl RelayTermination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::UpstreamError(_) => "upstream_error",
            Self::ClientDisconnected => "client_disconnected",
        }
    }
}

/// Summary of one relayed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOutcome {
    pub source: RelaySource,
    pub termination: RelayTermination,
    /// Text delivered to the client
    pub answer: String,
    pub token_usage: u32,
    /// Whether a write-back record was submitted to the cache
    pub write_back: bool,
}

/// Whether answers that did not complete normally are written to the cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialWriteBack {
    /// Only answers that reached the terminal chunk are recorded
    Never,
    /// Answers truncated by an upstream error are recorded as well
    #[default]
    OnUpstreamError,
    /// Every non-empty answer is recorded, including ones cut short by a
    /// client disconnect
    Always,
}

impl PartialWriteBack {
    pub fn allows(&self, termination: &RelayTermination) -> bool {
        match termination {
            RelayTermination::Completed => true,
            RelayTermination::UpstreamError(_) => {
                matches!(self, Self::OnUpstreamError | Self::Always)
            }
            RelayTermination::ClientDisconnected => matches!(self, Self::Always),
        }
    }
}
