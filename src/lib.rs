//! # Claude Code SDK for Rust
//!
//! Drives the Claude Code CLI as a child process over newline-delimited JSON
//! on stdio. Besides conversation messages, the two sides exchange control
//! requests in both directions: the SDK can interrupt a turn or change the
//! permission mode, and the CLI asks the SDK for permission decisions, hook
//! results and in-process MCP tool calls.
//!
//! ## One question, one answer
//!
//! [`query()`] spawns the CLI, streams every message of the exchange, and
//! cleans up when the stream ends.
//!
//! ```no_run
//! use claude_code_sdk::{ClaudeAgentOptions, Message, StreamExt, query};
//!
//! #[tokio::main]
//! async fn main() -> claude_code_sdk::Result<()> {
//!     let options = ClaudeAgentOptions::builder().max_turns(1).build();
//!     let mut stream = Box::pin(query("What is 2 + 2?", Some(options)).await?);
//!
//!     while let Some(message) = stream.next().await {
//!         match message? {
//!             Message::Assistant { message, .. } => println!("{}", message.text()),
//!             Message::Result { total_cost_usd, .. } => println!("cost: {total_cost_usd:?}"),
//!             _ => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Sessions
//!
//! [`ClaudeSDKClient`] keeps one CLI process for many turns. Each turn is a
//! [`query`](ClaudeSDKClient::query) followed by
//! [`receive_response`](ClaudeSDKClient::receive_response), which stops after
//! the turn's `result` message.
//!
//! ```no_run
//! # use claude_code_sdk::{ClaudeAgentOptions, ClaudeSDKClient, StreamExt};
//! # async fn example() -> claude_code_sdk::Result<()> {
//! let mut client = ClaudeSDKClient::new(ClaudeAgentOptions::default());
//! client.connect(None).await?;
//!
//! for prompt in ["Pick a number", "Double it"] {
//!     client.query(prompt).await?;
//!     let mut turn = Box::pin(client.receive_response()?);
//!     while let Some(message) = turn.next().await {
//!         println!("{:?}", message?);
//!     }
//! }
//!
//! client.disconnect().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Answering the CLI
//!
//! Callbacks registered in [`ClaudeAgentOptions`] are served from their own
//! tasks while messages keep flowing:
//!
//! - `can_use_tool`: a [`PermissionManager::callback`] decides each tool use
//! - `hooks`: [`HookRegistry::callback`] functions run on matching events
//! - `mcp_servers`: [`create_sdk_mcp_server`] tools are called in-process
//!
//! ```no_run
//! # use claude_code_sdk::{ClaudeAgentOptions, PermissionManager, PermissionResult};
//! let guard = PermissionManager::callback(|tool_name, input, _ctx| async move {
//!     if tool_name == "Bash" && input["command"].as_str().is_some_and(|c| c.contains("sudo")) {
//!         return Ok(PermissionResult::deny("no sudo"));
//!     }
//!     Ok(PermissionResult::allow())
//! });
//! let options = ClaudeAgentOptions::builder().can_use_tool(guard).build();
//! ```
//!
//! These need stdin to stay open, so they work with [`ClaudeSDKClient`] or a
//! [`Prompt::Messages`] stream, never with a plain string prompt.
//!
//! ## Layout
//!
//! - [`transport`]: the child process and JSON line framing
//! - [`control`]: the control-protocol engine shared by both entry points
//! - [`client`] and [`query()`]: the two entry points
//! - [`mcp`], [`hooks`], [`permissions`]: the callback surfaces
//! - [`message`] and [`types`]: typed views of the wire data
//!
//! ## Logging
//!
//! Events go through [`tracing`](https://crates.io/crates/tracing) and cost
//! nothing without a subscriber. CLI stderr lines are emitted at debug level
//! under the `claude_code_sdk::cli_stderr` target:
//!
//! ```rust,ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("claude_code_sdk=debug,claude_code_sdk::cli_stderr=off")
//!     .init();
//! ```
//!
//! ## Errors
//!
//! Everything returns [`Result`]; [`ClaudeError`] names the layer that
//! failed. A missing CLI surfaces as [`ClaudeError::CliNotFound`] from the
//! first call, a CLI crash as [`ClaudeError::Process`] at the end of the
//! message stream.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod callbacks;
pub mod client;
pub mod control;
pub mod error;
pub mod hooks;
pub mod mcp;
pub mod message;
pub mod permissions;
pub mod query;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use callbacks::{FnHookCallback, FnPermissionCallback, HookCallback, PermissionCallback};
pub use client::ClaudeSDKClient;
pub use error::{ClaudeError, Result};
pub use futures::StreamExt;
pub use hooks::{HookMatcherBuilder, HookRegistry};
pub use mcp::{SdkMcpServer, SdkMcpTool, ToolResult, create_sdk_mcp_server, tool};
pub use message::parse_message;
pub use permissions::PermissionManager;
pub use query::{query, query_with_transport};
pub use transport::{PromptInput, SubprocessTransport, Transport};
pub use types::{
    CanUseToolCallback, ClaudeAgentOptions, ClaudeAgentOptionsBuilder, ContentBlock, ContentValue,
    HookContext, HookDecision, HookEvent, HookMatcher, HookOutput, McpHttpServerConfig,
    McpServerConfig, McpServers, McpSseServerConfig, McpStdioServerConfig, Message,
    PermissionBehavior, PermissionMode, PermissionResult, PermissionResultAllow,
    PermissionResultDeny, PermissionRuleValue, PermissionUpdate, PermissionUpdateDestination,
    Prompt, SdkMcpServerConfig, SessionId, SystemPrompt, SystemPromptPreset, ToolName,
    ToolPermissionContext, UserContent,
};

/// Version of the SDK
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
