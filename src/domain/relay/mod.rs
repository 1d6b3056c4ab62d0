//! Streaming relay domain types
//!
//! A relay turns either a cached answer or a live upstream stream into an
//! ordered sequence of client frames, and decides whether the reconstructed
//! answer is written back to the semantic cache.

mod frame;
mod outcome;
mod request;

pub use frame::{StreamFrame, split_runes};
pub use outcome::{PartialWriteBack, RelayOutcome, RelaySource, RelayTermination};
pub use request::RelayRequest;
