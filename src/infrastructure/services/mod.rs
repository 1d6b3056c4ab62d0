//! Infrastructure services

mod completion_relay;

pub use completion_relay::{CompletionRelay, DEFAULT_REPLAY_CHUNK_SIZE, PreparedRelay};
