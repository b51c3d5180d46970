//! Prompt input for sessions and one-shot queries

use futures::Stream;
use std::pin::Pin;

/// Asynchronous source of outbound user-message objects
pub type InputStream = Pin<Box<dyn Stream<Item = serde_json::Value> + Send>>;

/// What to send to Claude
///
/// A `Text` prompt is passed on the command line and the CLI's stdin is
/// closed, so no control channel exists. `Messages` keeps stdin open in
/// stream-json mode, which permission callbacks, hooks, and in-process MCP
/// servers all require.
pub enum Prompt {
    /// A single string prompt
    Text(String),
    /// A stream of user-message objects written as JSON lines
    Messages(InputStream),
}

impl Prompt {
    /// Wrap any `Send` stream of message objects
    pub fn stream<S>(messages: S) -> Self
    where
        S: Stream<Item = serde_json::Value> + Send + 'static,
    {
        Self::Messages(Box::pin(messages))
    }

    /// Whether this prompt keeps a bidirectional channel open
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Messages(_))
    }
}

impl std::fmt::Debug for Prompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Messages(_) => f.write_str("Messages(<stream>)"),
        }
    }
}

impl From<String> for Prompt {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Prompt {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<InputStream> for Prompt {
    fn from(stream: InputStream) -> Self {
        Self::Messages(stream)
    }
}

/// Build the user-message object the CLI expects on stdin
#[must_use]
pub fn user_message(content: &str, session_id: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "user",
        "message": {"role": "user", "content": content},
        "parent_tool_use_id": null,
        "session_id": session_id,
    })
}
