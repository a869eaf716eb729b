//! Incremental decoder from response body chunks to answer tokens

use crate::stream::event::{decode_line, FrameOutcome, IgnoreReason};
use crate::stream::frame::FrameSplitter;
use crate::Result;
use async_stream::try_stream;
use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};
use tracing::{debug, trace};

/// Counters collected while decoding one response
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Lines seen (including ignored ones)
    pub lines: usize,
    /// Tokens extracted
    pub tokens: usize,
    /// `data:` lines whose payload failed to parse
    pub malformed: usize,
}

/// Stateful decoder for one event-stream response
///
/// Once the `[DONE]` sentinel is seen the decoder latches: the rest of the
/// chunk that carried it, and every later chunk, is dropped.
#[derive(Clone, Debug, Default)]
pub struct StreamDecoder {
    splitter: FrameSplitter,
    finished: bool,
    stats: DecodeStats,
}

impl StreamDecoder {
    /// Create a decoder for a fresh response
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk and return the tokens it yields, in order
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        if self.finished {
            return Vec::new();
        }
        let lines = self.splitter.push(chunk);
        self.decode_lines(lines)
    }

    /// Feed an already decoded text chunk
    pub fn feed_str(&mut self, chunk: &str) -> Vec<String> {
        self.feed(chunk.as_bytes())
    }

    /// Signal that the transport has closed and decode any unterminated line
    pub fn finish(&mut self) -> Vec<String> {
        if self.finished {
            return Vec::new();
        }
        let tokens = match self.splitter.finish() {
            Some(line) => self.decode_lines(vec![line]),
            None => Vec::new(),
        };
        self.finished = true;
        tokens
    }

    /// Whether the stream has ended (sentinel seen or transport closed)
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Counters for the response so far
    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    fn decode_lines(&mut self, lines: Vec<String>) -> Vec<String> {
        let mut tokens = Vec::new();

        for line in lines {
            self.stats.lines += 1;

            match decode_line(&line) {
                FrameOutcome::Token(token) => {
                    trace!("Decoded token: {:?}", token);
                    self.stats.tokens += 1;
                    tokens.push(token);
                }
                FrameOutcome::Done => {
                    debug!("End-of-stream sentinel after {} tokens", self.stats.tokens);
                    self.finished = true;
                    self.splitter.reset();
                    break;
                }
                FrameOutcome::Ignored(IgnoreReason::Malformed) => {
                    debug!("Skipping malformed event frame: {}", line);
                    self.stats.malformed += 1;
                }
                FrameOutcome::Ignored(_) => {}
            }
        }

        tokens
    }
}

/// Adapt a response body into a stream of answer tokens
///
/// The token stream ends at the `[DONE]` sentinel or when the body closes,
/// whichever comes first. A body read error is yielded once and ends the
/// stream.
pub fn decode_tokens<S>(body: S) -> BoxStream<'static, Result<String>>
where
    S: Stream<Item = Result<Bytes>> + Send + 'static,
{
    Box::pin(try_stream! {
        let mut body = Box::pin(body);
        let mut decoder = StreamDecoder::new();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for token in decoder.feed(&chunk) {
                yield token;
            }
            if decoder.is_finished() {
                break;
            }
        }

        for token in decoder.finish() {
            yield token;
        }

        let stats = decoder.stats();
        debug!(
            "Response decoded: {} lines, {} tokens, {} malformed",
            stats.lines, stats.tokens, stats.malformed
        );
    })
}
