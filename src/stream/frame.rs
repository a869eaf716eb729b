//! Line reassembly for server-sent-event bodies
//!
//! Transport chunks arrive at arbitrary byte boundaries. The splitter keeps any
//! incomplete trailing line (as raw bytes, so a UTF-8 sequence cut in half is
//! also held back) until the rest of it arrives.

/// Splits transport chunks into complete event lines
#[derive(Clone, Debug, Default)]
pub struct FrameSplitter {
    /// Bytes received after the last line break
    pending: Vec<u8>,
    /// Prefix of `pending` already searched for a line break
    scanned: usize,
}

impl FrameSplitter {
    /// Create an empty splitter
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a raw chunk and return every line it completes, in order
    ///
    /// A trailing `\r` is stripped so CRLF-delimited streams decode the same
    /// as LF-delimited ones.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut line_start = 0;
        let mut search_from = self.scanned;
        while let Some(offset) = self.pending[search_from..].iter().position(|&b| b == b'\n') {
            let end = search_from + offset;
            lines.push(decode_line(&self.pending[line_start..end]));
            line_start = end + 1;
            search_from = line_start;
        }

        self.pending.drain(..line_start);
        self.scanned = self.pending.len();
        lines
    }

    /// Feed an already decoded text chunk
    pub fn push_str(&mut self, chunk: &str) -> Vec<String> {
        self.push(chunk.as_bytes())
    }

    /// Release the buffered partial line once the transport reports completion
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.pending);
        self.scanned = 0;
        Some(decode_line(&raw))
    }

    /// Number of bytes waiting for a line break
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop any buffered partial line
    pub fn reset(&mut self) {
        self.pending.clear();
        self.scanned = 0;
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
