//! Error taxonomy
//!
//! One enum for the whole SDK. Variants fall into four layers:
//!
//! - process: [`CliNotFound`](ClaudeError::CliNotFound),
//!   [`Process`](ClaudeError::Process), [`Io`](ClaudeError::Io)
//! - wire: [`Connection`](ClaudeError::Connection),
//!   [`Transport`](ClaudeError::Transport), [`JsonDecode`](ClaudeError::JsonDecode),
//!   [`JsonEncode`](ClaudeError::JsonEncode), [`MessageParse`](ClaudeError::MessageParse)
//! - control channel: [`ControlProtocol`](ClaudeError::ControlProtocol),
//!   [`ControlRequestFailed`](ClaudeError::ControlRequestFailed),
//!   [`ControlTimeout`](ClaudeError::ControlTimeout), [`Hook`](ClaudeError::Hook),
//!   [`Mcp`](ClaudeError::Mcp)
//! - caller misuse: [`InvalidConfig`](ClaudeError::InvalidConfig),
//!   [`NotConnected`](ClaudeError::NotConnected)

use thiserror::Error;

/// Any failure surfaced by the SDK
#[derive(Error, Debug)]
pub enum ClaudeError {
    /// No `claude` executable could be located or spawned
    #[error("Claude Code CLI not found: {0}")]
    CliNotFound(String),

    /// The CLI exited unsuccessfully
    #[error("Process error (exit code {exit_code}): {message}")]
    Process {
        /// Human-readable summary
        message: String,
        /// Exit status, `-1` when killed by a signal
        exit_code: i32,
        /// Captured stderr, when stderr was piped
        stderr: Option<String>,
    },

    /// OS-level failure on the child's pipes
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The session cannot be used: not started, already gone, or the
    /// handshake never completed
    #[error("Connection error: {0}")]
    Connection(String),

    /// Raw byte-stream failure below the JSON layer
    #[error("Transport error: {0}")]
    Transport(String),

    /// CLI output that is not valid JSON, including a line that outgrew the
    /// buffer ceiling
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),

    /// A value could not be serialized for the wire
    #[error("JSON encode error: {0}")]
    JsonEncode(String),

    /// Valid JSON that is not a recognizable message; carries the raw value
    #[error("Message parse error: {message}")]
    MessageParse {
        /// What was wrong
        message: String,
        /// The offending message
        data: Option<serde_json::Value>,
    },

    /// Local misuse of the control channel, or an inbound request this side
    /// cannot serve
    #[error("Control protocol error: {0}")]
    ControlProtocol(String),

    /// The CLI answered a control request with `subtype: error`
    #[error("Control request failed: {0}")]
    ControlRequestFailed(String),

    /// No response to an outbound control request within the deadline
    #[error("Control request timed out after {timeout_secs} seconds: {request_type}")]
    ControlTimeout {
        /// Deadline that elapsed
        timeout_secs: u64,
        /// Subtype of the request
        request_type: String,
    },

    /// A `hook_callback` could not be served
    #[error("Hook error: {0}")]
    Hook(String),

    /// An `mcp_message` could not be routed, or a tool handler failed
    #[error("MCP error: {0}")]
    Mcp(String),

    /// Options that contradict each other or the prompt mode
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Client operation before `connect` or after `disconnect`
    #[error("Not connected. Call connect() before operations.")]
    NotConnected,
}

/// `Result` with [`ClaudeError`]
pub type Result<T> = std::result::Result<T, ClaudeError>;

impl ClaudeError {
    /// Missing-CLI error with install instructions
    #[must_use]
    pub fn cli_not_found() -> Self {
        Self::CliNotFound(
            "Claude Code not found. Install with:\n\
             npm install -g @anthropic-ai/claude-code\n\
             \n\
             If already installed locally, try:\n\
             export PATH=\"$HOME/node_modules/.bin:$PATH\"\n\
             \n\
             Or set `cli_path` in ClaudeAgentOptions"
                .to_string(),
        )
    }

    /// Unsuccessful exit of the CLI
    pub fn process(message: impl Into<String>, exit_code: i32, stderr: Option<String>) -> Self {
        Self::Process {
            message: message.into(),
            exit_code,
            stderr,
        }
    }

    /// Decode error for buffered output that outgrew `limit` bytes
    #[must_use]
    pub fn buffer_overflow(limit: usize) -> Self {
        Self::JsonDecode(serde_json::Error::io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("JSON message exceeded maximum buffer size of {limit} bytes"),
        )))
    }

    /// Unrecognizable message, keeping the raw value
    pub fn message_parse(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self::MessageParse {
            message: message.into(),
            data,
        }
    }

    /// Outbound control request that saw no answer
    pub fn control_timeout(timeout_secs: u64, request_type: impl Into<String>) -> Self {
        Self::ControlTimeout {
            timeout_secs,
            request_type: request_type.into(),
        }
    }

    /// `NotConnected`, for use with `ok_or_else`
    #[must_use]
    pub fn not_connected() -> Self {
        Self::NotConnected
    }
}

macro_rules! message_constructors {
    ($($(#[$doc:meta])* $name:ident => $variant:ident;)*) => {
        impl ClaudeError {
            $(
                $(#[$doc])*
                pub fn $name(message: impl Into<String>) -> Self {
                    Self::$variant(message.into())
                }
            )*
        }
    };
}

message_constructors! {
    /// `Connection` error
    connection => Connection;
    /// `Transport` error
    transport => Transport;
    /// `JsonEncode` error
    json_encode => JsonEncode;
    /// `ControlProtocol` error
    control_protocol => ControlProtocol;
    /// `ControlRequestFailed` error carrying the CLI's text
    control_request_failed => ControlRequestFailed;
    /// `Hook` error
    hook => Hook;
    /// `Mcp` error
    mcp => Mcp;
    /// `InvalidConfig` error
    invalid_config => InvalidConfig;
}
