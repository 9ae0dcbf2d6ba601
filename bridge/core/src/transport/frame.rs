//! Line Framing
//!
//! Wire format for controller-bridge messages: one UTF-8 text message per
//! line, terminated by `\n`.
//!
//! # Frame Format
//!
//! ```text
//! {"command":"set_expression","name":"joy","value":0.8}\n
//! {"command":"reset_expressions"}\n
//! ```
//!
//! # Safety
//!
//! - Unterminated lines longer than `MAX_LINE_LENGTH` are dropped
//! - Bytes are split before UTF-8 decoding, so multi-byte characters may
//!   straddle reads safely

use serde::Serialize;

use super::TransportError;

/// Maximum length of a single unterminated line (64 KiB)
///
/// Guards against unbounded growth when a peer never sends a newline.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Minimum buffer capacity for decoder
const MIN_BUFFER_CAPACITY: usize = 4096;

/// Encode a message as one JSON line (trailing `\n` included)
///
/// # Errors
///
/// Returns `TransportError::Serialization` if JSON serialization fails.
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, TransportError> {
    let mut buf =
        serde_json::to_vec(msg).map_err(|e| TransportError::Serialization(e.to_string()))?;
    buf.push(b'\n');
    Ok(buf)
}

/// Streaming line splitter
///
/// Buffers incoming bytes and yields complete, non-blank lines. The buffer
/// only ever holds the unterminated tail of the data pushed so far.
#[derive(Debug)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    max_line_length: usize,
    /// Set after an oversized line was dropped; bytes are skipped until `\n`
    discarding: bool,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDecoder {
    /// Create a decoder with the default line cap
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_line_length(MAX_LINE_LENGTH)
    }

    /// Create a decoder with a custom line cap
    #[must_use]
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(MIN_BUFFER_CAPACITY),
            max_line_length: max_line_length.max(1),
            discarding: false,
        }
    }

    /// Append bytes and return every line completed by them
    ///
    /// Empty and whitespace-only lines are skipped silently.
    pub fn push(&mut self, data: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = data;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (head, tail) = rest.split_at(pos);
            rest = &tail[1..];

            if self.discarding {
                // Tail end of an oversized line
                self.discarding = false;
                continue;
            }

            self.buffer.extend_from_slice(head);
            if self.buffer.len() > self.max_line_length {
                tracing::warn!(
                    length = self.buffer.len(),
                    max = self.max_line_length,
                    "Dropping oversized line"
                );
                self.buffer.clear();
                continue;
            }

            let line = String::from_utf8_lossy(&self.buffer).into_owned();
            self.buffer.clear();

            if !line.trim().is_empty() {
                lines.push(line);
            }
        }

        if !self.discarding {
            self.buffer.extend_from_slice(rest);
            if self.buffer.len() > self.max_line_length {
                tracing::warn!(
                    length = self.buffer.len(),
                    max = self.max_line_length,
                    "Unterminated line exceeds cap, discarding until newline"
                );
                self.buffer.clear();
                self.discarding = true;
            }
        }

        lines
    }

    /// Number of buffered bytes belonging to the unterminated tail
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }
}
