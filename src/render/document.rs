//! The derived document handed to the display layer

use crate::render::classify::{classify_prose, Block};
use crate::render::segment::{split_segments, Segment};
use serde::Serialize;
use std::fmt;

/// One segment of the document with its derived blocks
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "blocks", rename_all = "snake_case")]
pub enum DocumentSegment {
    /// Prose expanded into classified blocks (possibly none)
    Prose(Vec<Block>),
    /// A single verbatim [`Block::Code`]
    Code(Block),
}

impl DocumentSegment {
    pub fn blocks(&self) -> &[Block] {
        match self {
            DocumentSegment::Prose(blocks) => blocks,
            DocumentSegment::Code(block) => std::slice::from_ref(block),
        }
    }
}

/// Structured view of an answer
///
/// Pure derived state: it is rebuilt from the full answer text on every
/// change and carries nothing over between builds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    segments: Vec<DocumentSegment>,
}

impl Document {
    /// Build the document for the current answer text
    pub fn build(text: &str) -> Self {
        let segments = split_segments(text)
            .into_iter()
            .map(|segment| match segment {
                Segment::Prose(prose) => DocumentSegment::Prose(classify_prose(&prose)),
                Segment::Code(code) => DocumentSegment::Code(Block::code(code)),
            })
            .collect();

        Self { segments }
    }

    pub fn segments(&self) -> &[DocumentSegment] {
        &self.segments
    }

    /// All blocks in display order
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.segments.iter().flat_map(|segment| segment.blocks())
    }

    pub fn block_count(&self) -> usize {
        self.blocks().count()
    }

    /// True when there is nothing to display
    pub fn is_empty(&self) -> bool {
        self.block_count() == 0
    }

    /// Export for display collaborators that consume JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Plain-text rendering for terminals
impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, block) in self.blocks().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            match block {
                Block::Heading { level, text } => {
                    writeln!(f, "{} {}", "#".repeat(*level as usize), text)?;
                }
                Block::BulletList { items } => {
                    for item in items {
                        writeln!(f, "  \u{2022} {}", item)?;
                    }
                }
                Block::NumberedList { items } => {
                    for (n, item) in items.iter().enumerate() {
                        writeln!(f, "  {}. {}", n + 1, item)?;
                    }
                }
                Block::Paragraph { text } => writeln!(f, "{}", text)?,
                Block::Code { content } => {
                    for line in content.lines() {
                        writeln!(f, "    {}", line)?;
                    }
                }
            }
        }
        Ok(())
    }
}
