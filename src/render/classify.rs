//! Line classification of prose segments into blocks

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

fn re_numbered_item() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[0-9]+\.\s").expect("re_numbered_item: pattern is valid and should always compile")
    })
}

/// One structural unit of the rendered answer
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Heading { level: u8, text: String },
    BulletList { items: Vec<String> },
    NumberedList { items: Vec<String> },
    Paragraph { text: String },
    /// Verbatim fenced code
    Code { content: String },
}

impl Block {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Block::Heading {
            level,
            text: text.into(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph { text: text.into() }
    }

    pub fn code(content: impl Into<String>) -> Self {
        Block::Code {
            content: content.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ListKind {
    Bullet,
    Numbered,
}

/// An open run of list items waiting to be flushed
#[derive(Debug, Default)]
struct BlockWriter {
    blocks: Vec<Block>,
    run: Option<(ListKind, Vec<String>)>,
}

impl BlockWriter {
    fn flush(&mut self) {
        if let Some((kind, items)) = self.run.take() {
            self.blocks.push(match kind {
                ListKind::Bullet => Block::BulletList { items },
                ListKind::Numbered => Block::NumberedList { items },
            });
        }
    }

    fn push(&mut self, block: Block) {
        self.flush();
        self.blocks.push(block);
    }

    fn push_item(&mut self, kind: ListKind, item: &str) {
        if let Some((open, items)) = &mut self.run {
            if *open == kind {
                items.push(item.to_string());
                return;
            }
        }
        self.flush();
        self.run = Some((kind, vec![item.to_string()]));
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }
}

/// Classify every line of a prose segment, merging adjacent list items
///
/// Lines are trimmed before matching. A blank line emits nothing but closes
/// any open list run.
pub fn classify_prose(prose: &str) -> Vec<Block> {
    let mut writer = BlockWriter::default();

    for line in prose.lines() {
        let line = line.trim();

        if line.is_empty() {
            writer.flush();
        } else if let Some(text) = line.strip_prefix("### ") {
            writer.push(Block::heading(3, text));
        } else if let Some(text) = line.strip_prefix("## ") {
            writer.push(Block::heading(2, text));
        } else if let Some(text) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
            writer.push_item(ListKind::Bullet, text);
        } else if let Some(m) = re_numbered_item().find(line) {
            writer.push_item(ListKind::Numbered, &line[m.end()..]);
        } else {
            writer.push(Block::paragraph(line));
        }
    }

    writer.finish()
}
