//! Reassembly of JSON messages from raw stdout chunks

use serde_json::Value;

use crate::error::{ClaudeError, Result};
use crate::utils::preview;

/// Maximum bytes held while waiting for a JSON message to complete (1 MiB)
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// Accumulates newline-separated fragments until they parse as JSON
///
/// The CLI writes one JSON object per line, but a read may end mid-object and
/// a single read may carry several objects. Each line piece is appended to the
/// pending buffer and parsed speculatively; the buffer is cleared as soon as a
/// parse succeeds.
///
/// The ceiling is checked on every feed, so a fragment that never sees a
/// newline still fails once it outgrows `max_size`.
#[derive(Debug)]
pub struct JsonLineBuffer {
    buffer: String,
    // Trailing bytes of a UTF-8 sequence split across reads
    partial: Vec<u8>,
    max_size: usize,
}

impl JsonLineBuffer {
    /// Create a buffer with the given ceiling in bytes
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            buffer: String::new(),
            partial: Vec::new(),
            max_size,
        }
    }

    /// Feed one raw chunk, returning every message it completed, in order
    ///
    /// # Errors
    ///
    /// Returns a decode error when the pending fragment grows past the
    /// ceiling. The pending fragment is discarded.
    pub fn feed(&mut self, chunk: &str) -> Result<Vec<Value>> {
        let mut messages = Vec::new();
        for piece in chunk.split('\n') {
            // Whitespace inside a pending fragment may belong to a string
            if self.buffer.is_empty() && piece.trim().is_empty() {
                continue;
            }

            self.buffer.push_str(piece);
            if self.buffer.len() > self.max_size {
                tracing::warn!(
                    limit = self.max_size,
                    preview = %preview(&self.buffer, 100),
                    "Discarding oversized JSON fragment"
                );
                self.buffer.clear();
                return Err(ClaudeError::buffer_overflow(self.max_size));
            }

            if let Ok(value) = serde_json::from_str::<Value>(&self.buffer) {
                self.buffer.clear();
                messages.push(value);
            }
        }
        Ok(messages)
    }

    /// Feed raw bytes as read from the pipe
    ///
    /// A multi-byte character cut by the read boundary is held back until
    /// the next call. Invalid UTF-8 is replaced, not rejected.
    ///
    /// # Errors
    ///
    /// Same as [`Self::feed`].
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Vec<Value>> {
        self.partial.extend_from_slice(bytes);
        let complete = match std::str::from_utf8(&self.partial) {
            Ok(_) => self.partial.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => self.partial.len(),
        };
        let rest = self.partial.split_off(complete);
        let text = String::from_utf8_lossy(&self.partial).into_owned();
        self.partial = rest;
        self.feed(&text)
    }

    /// Bytes waiting for the rest of a message
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.buffer.len() + self.partial.len()
    }
}

impl Default for JsonLineBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BUFFER_SIZE)
    }
}
