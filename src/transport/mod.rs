//! Transport layer between the SDK and the Claude Code CLI
//!
//! The engine only needs a duplex of JSON messages: a way to write lines, to
//! close the input side, and a bounded channel of decoded messages. A full
//! channel pauses the transport's reads, so a slow consumer holds the CLI
//! back instead of buffering its output. [`Transport`] is
//! that seam; [`SubprocessTransport`] implements it over the stdio of a
//! `claude` child process, and tests substitute in-memory implementations.

pub mod buffer;
pub mod subprocess;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

/// Capacity of the channel returned by [`Transport::read_messages`]
pub const READ_CHANNEL_CAPACITY: usize = 32;

/// Duplex JSON message channel to the CLI
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to the transport
    ///
    /// # Errors
    /// Returns error if connection fails
    async fn connect(&mut self) -> Result<()>;

    /// Write raw data (newline-terminated JSON)
    ///
    /// # Errors
    /// Returns error if the write fails or the transport is not ready
    async fn write(&mut self, data: &str) -> Result<()>;

    /// Close the input side (stdin)
    ///
    /// # Errors
    /// Returns error if closing fails
    async fn end_input(&mut self) -> Result<()>;

    /// Start reading and return the channel of decoded messages
    ///
    /// Called once. The channel carries decode and process failures as `Err`
    /// items and closes at end of stream. Implementations stop reading while
    /// the channel is full and stop for good once the receiver is dropped.
    fn read_messages(&mut self) -> mpsc::Receiver<Result<serde_json::Value>>;

    /// Whether writes can currently succeed
    fn is_ready(&self) -> bool;

    /// Close the transport and clean up resources
    ///
    /// # Errors
    /// Returns error if cleanup fails
    async fn close(&mut self) -> Result<()>;
}

pub use buffer::{DEFAULT_MAX_BUFFER_SIZE, JsonLineBuffer};
pub use subprocess::{PromptInput, SubprocessTransport};
