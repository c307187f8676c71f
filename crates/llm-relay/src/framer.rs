//! Incremental line framing for streamed response bodies.
//!
//! Network reads split the body at arbitrary byte offsets: in the middle
//! of an SSE `data:` line, between the `\r` and `\n` of a CRLF, or inside
//! a multi-byte UTF-8 sequence. [`LineFramer`] absorbs those splits and
//! hands out complete lines only. It is protocol-agnostic; SSE and
//! newline-delimited JSON bodies both reduce to "one payload per line".
//!
//! ```rust
//! use llm_relay::framer::LineFramer;
//!
//! let mut framer = LineFramer::new();
//! assert!(framer.feed(b"data: {\"a\"").unwrap().is_empty());
//! let lines = framer.feed(b":1}\r\n\r\ndata: [DONE]\n").unwrap();
//! assert_eq!(lines, vec!["data: {\"a\":1}", "data: [DONE]"]);
//! ```

use crate::error::LlmError;

/// Default cap on buffered, not-yet-terminated bytes.
pub const DEFAULT_MAX_BUFFER: usize = 16 * 1024 * 1024; // 16 MiB

/// Splits an incoming byte stream into complete, non-empty lines.
///
/// Lines are terminated by `\n`; a trailing `\r` is stripped. Empty
/// lines are dropped since they only separate SSE frames. Bytes that can
/// never form valid UTF-8 are skipped; a UTF-8 sequence cut by a chunk
/// boundary is held back until the rest of it arrives.
#[derive(Debug)]
pub struct LineFramer {
    pending: String,
    utf8_tail: Vec<u8>,
    max_buffer: usize,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFramer {
    /// Creates a framer with the [`DEFAULT_MAX_BUFFER`] limit.
    pub fn new() -> Self {
        Self::with_max_buffer(DEFAULT_MAX_BUFFER)
    }

    /// Creates a framer that fails once more than `max_buffer` bytes are
    /// waiting for a line terminator.
    pub fn with_max_buffer(max_buffer: usize) -> Self {
        Self {
            pending: String::new(),
            utf8_tail: Vec::new(),
            max_buffer,
        }
    }

    /// Feeds one chunk and returns every line it completed, in order.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ResponseFormat`] when the unterminated
    /// remainder exceeds the configured limit. The buffer is cleared.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<String>, LlmError> {
        if chunk.is_empty() {
            return Ok(Vec::new());
        }

        self.utf8_tail.extend_from_slice(chunk);
        self.decode();
        let lines = self.drain_lines();

        if self.buffered_len() > self.max_buffer {
            let raw: String = self.pending.chars().take(256).collect();
            self.pending.clear();
            self.utf8_tail.clear();
            return Err(LlmError::ResponseFormat {
                message: format!(
                    "stream line exceeded {} bytes without a terminator",
                    self.max_buffer
                ),
                raw,
            });
        }

        Ok(lines)
    }

    /// Flushes the unterminated remainder once the stream has closed.
    ///
    /// Returns `None` if nothing is left. An incomplete trailing UTF-8
    /// sequence is discarded.
    pub fn finish(&mut self) -> Option<String> {
        self.utf8_tail.clear();
        let rest = std::mem::take(&mut self.pending);
        let line = rest.trim_end_matches('\r');
        (!line.is_empty()).then(|| line.to_string())
    }

    /// Number of bytes held back waiting for a terminator.
    pub fn buffered_len(&self) -> usize {
        self.pending.len() + self.utf8_tail.len()
    }

    fn decode(&mut self) {
        loop {
            match std::str::from_utf8(&self.utf8_tail) {
                Ok(text) => {
                    self.pending.push_str(text);
                    self.utf8_tail.clear();
                    return;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    if valid_up_to > 0 {
                        // SAFETY: `from_utf8` validated bytes up to this index.
                        let valid =
                            unsafe { std::str::from_utf8_unchecked(&self.utf8_tail[..valid_up_to]) };
                        self.pending.push_str(valid);
                    }
                    match e.error_len() {
                        // Permanently invalid bytes: skip and keep decoding.
                        Some(len) => {
                            self.utf8_tail.drain(..valid_up_to + len);
                        }
                        // Truncated sequence: wait for the next chunk.
                        None => {
                            self.utf8_tail.drain(..valid_up_to);
                            return;
                        }
                    }
                }
            }
        }
    }

    fn drain_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].find('\n') {
            let end = start + offset;
            let line = self.pending[start..end].trim_end_matches('\r');
            if !line.is_empty() {
                lines.push(line.to_string());
            }
            start = end + 1;
        }
        self.pending.drain(..start);
        lines
    }
}
