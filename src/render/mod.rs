//! Structural rendering of a (possibly partial) answer
//!
//! The answer is re-rendered from scratch on every growth:
//! [`split_segments`] separates fenced code from prose, [`classify_prose`]
//! turns prose lines into blocks, and [`Document::build`] assembles both.

pub mod classify;
pub mod document;
pub mod segment;

pub use classify::{classify_prose, Block};
pub use document::{Document, DocumentSegment};
pub use segment::{split_segments, Segment, FENCE};
