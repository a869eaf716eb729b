//! Incremental decoding of the completion service's event stream
//!
//! - **frame**: reassembles transport chunks into complete lines
//! - **event**: decodes one `data:` line into a token, the end sentinel, or nothing
//! - **decoder**: stateful per-response decoder and the body-to-token stream adapter
//! - **accumulator**: the append-only answer text

pub mod accumulator;
pub mod decoder;
pub mod event;
pub mod frame;

pub use accumulator::Accumulator;
pub use decoder::{decode_tokens, DecodeStats, StreamDecoder};
pub use event::{decode_line, FrameOutcome, IgnoreReason, DATA_PREFIX, DONE_SENTINEL};
pub use frame::FrameSplitter;
