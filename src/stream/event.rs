//! Decoding of individual `data:` event lines
//!
//! Each line either carries a JSON delta record, the `[DONE]` sentinel, or
//! nothing we care about. Lines that cannot be used are reported as
//! [`FrameOutcome::Ignored`] with the reason, never as errors.

use serde_json::Value;

/// Prefix that marks a data-carrying event line
pub const DATA_PREFIX: &str = "data:";

/// Payload that ends the stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// Why a line produced no token
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The line does not start with `data:`
    NotData,
    /// The payload is not a parseable delta record
    Malformed,
    /// The record parsed but has no (or empty) `choices[0].delta.content`
    NoContent,
}

/// Result of decoding one event line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// An incremental fragment of the answer
    Token(String),
    /// The `[DONE]` sentinel; no further lines should be processed
    Done,
    /// Nothing to append
    Ignored(IgnoreReason),
}

/// Decode a single event line
///
/// Only `choices[0].delta.content` is read; the rest of the record is not
/// validated, so an odd sibling choice never hides the first one.
pub fn decode_line(line: &str) -> FrameOutcome {
    let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
        return FrameOutcome::Ignored(IgnoreReason::NotData);
    };

    let payload = rest.trim();
    if payload == DONE_SENTINEL {
        return FrameOutcome::Done;
    }

    let record: Value = match serde_json::from_str(payload) {
        Ok(record @ Value::Object(_)) => record,
        _ => return FrameOutcome::Ignored(IgnoreReason::Malformed),
    };

    match first_delta_content(&record) {
        Some(content) if !content.is_empty() => FrameOutcome::Token(content.to_string()),
        _ => FrameOutcome::Ignored(IgnoreReason::NoContent),
    }
}

fn first_delta_content(record: &Value) -> Option<&str> {
    record
        .get("choices")?
        .as_array()?
        .first()?
        .get("delta")?
        .get("content")?
        .as_str()
}
