//! Splitting the answer into prose and fenced code

/// Fenced-code delimiter
pub const FENCE: &str = "```";

/// A maximal span of the answer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// Text outside fences, untouched
    Prose(String),
    /// Text between fences, surrounding whitespace trimmed
    Code(String),
}

impl Segment {
    pub fn is_code(&self) -> bool {
        matches!(self, Segment::Code(_))
    }

    pub fn content(&self) -> &str {
        match self {
            Segment::Prose(text) | Segment::Code(text) => text,
        }
    }
}

/// Split text on fences into alternating segments, starting with prose
///
/// `n` fences always produce `n + 1` segments. With an odd number of fences
/// the last segment is code that has not been closed yet; it is still
/// reported as code so a block that is mid-stream renders as one.
pub fn split_segments(text: &str) -> Vec<Segment> {
    text.split(FENCE)
        .enumerate()
        .map(|(index, part)| {
            if index % 2 == 1 {
                Segment::Code(part.trim().to_string())
            } else {
                Segment::Prose(part.to_string())
            }
        })
        .collect()
}
