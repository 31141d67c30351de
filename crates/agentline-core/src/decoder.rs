//! Incremental line framing for streamed response bodies.
//!
//! Bytes arrive in arbitrary network-sized pieces. A piece can end in the
//! middle of a line, or in the middle of a multi-byte character; both are
//! carried over to the next call so that callers only ever see whole lines.

use crate::{AgentlineError, Result};
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use tracing::debug;

/// Stateful byte-to-line decoder.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Trailing bytes of a not-yet-complete UTF-8 sequence
    pending_bytes: Vec<u8>,
    /// Text received since the last line terminator
    line_buffer: String,
}

impl FrameDecoder {
    /// Create a new decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of bytes and return every line it completes.
    ///
    /// Lines are returned without their terminator; a `\r` right before the
    /// `\n` is stripped as well. Empty lines are returned as empty strings.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
        self.decode_into_buffer(chunk)?;

        let Some(last_newline) = self.line_buffer.rfind('\n') else {
            return Ok(Vec::new());
        };

        let rest = self.line_buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.line_buffer, rest);

        let lines = complete[..complete.len() - 1]
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();

        Ok(lines)
    }

    /// Signal end of input. An unterminated trailing fragment is not a valid
    /// line and is discarded.
    pub fn finish(&mut self) {
        if !self.line_buffer.is_empty() || !self.pending_bytes.is_empty() {
            debug!(
                target: "agentline::decoder",
                "Discarding unterminated fragment at end of stream ({} chars, {} bytes undecoded)",
                self.line_buffer.chars().count(),
                self.pending_bytes.len()
            );
        }
        self.line_buffer.clear();
        self.pending_bytes.clear();
    }

    /// Number of buffered bytes not yet emitted as a line.
    pub fn buffered_len(&self) -> usize {
        self.line_buffer.len() + self.pending_bytes.len()
    }

    fn decode_into_buffer(&mut self, chunk: &[u8]) -> Result<()> {
        let joined: Vec<u8>;
        let bytes: &[u8] = if self.pending_bytes.is_empty() {
            chunk
        } else {
            let mut carried = std::mem::take(&mut self.pending_bytes);
            carried.extend_from_slice(chunk);
            joined = carried;
            &joined
        };

        match std::str::from_utf8(bytes) {
            Ok(text) => {
                self.line_buffer.push_str(text);
                Ok(())
            }
            Err(e) if e.error_len().is_none() => {
                // Input ends inside a multi-byte sequence: keep the tail for later.
                let (head, tail) = bytes.split_at(e.valid_up_to());
                let text = std::str::from_utf8(head)
                    .map_err(|e| AgentlineError::Decode(e.to_string()))?;
                self.line_buffer.push_str(text);
                self.pending_bytes = tail.to_vec();
                Ok(())
            }
            Err(e) => Err(AgentlineError::Decode(format!(
                "invalid UTF-8 after {} buffered bytes",
                e.valid_up_to()
            ))),
        }
    }
}

struct LineStreamState<S> {
    chunks: S,
    decoder: FrameDecoder,
    ready: VecDeque<String>,
    done: bool,
}

/// Turn a stream of byte chunks into a lazy stream of complete lines.
///
/// The first error (from the source or from decoding) is yielded once and
/// ends the stream. End of input discards any unterminated fragment.
pub fn decode_lines<S, B, E>(chunks: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<AgentlineError>,
{
    let state = LineStreamState {
        chunks,
        decoder: FrameDecoder::new(),
        ready: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.ready.pop_front() {
                return Some((Ok(line), state));
            }
            if state.done {
                return None;
            }

            match state.chunks.next().await {
                Some(Ok(bytes)) => match state.decoder.push(bytes.as_ref()) {
                    Ok(lines) => state.ready.extend(lines),
                    Err(e) => {
                        state.done = true;
                        return Some((Err(e), state));
                    }
                },
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e.into()), state));
                }
                None => {
                    state.decoder.finish();
                    state.done = true;
                }
            }
        }
    })
}
