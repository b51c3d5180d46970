//! In-process MCP (Model Context Protocol) servers
//!
//! Application-defined async functions can serve as tools without a separate
//! server process. The CLI talks to an in-process server through `mcp_message`
//! control requests; [`SdkMcpServer`] answers the small set of JSON-RPC
//! methods involved (`initialize`, `tools/list`, `tools/call`,
//! `notifications/initialized`).
//!
//! # Quick Start
//!
//! ```no_run
//! use claude_code_sdk::mcp::{ToolResult, create_sdk_mcp_server, tool};
//! use claude_code_sdk::ClaudeAgentOptions;
//! use claude_code_sdk::types::McpServers;
//! use serde_json::json;
//! use std::collections::HashMap;
//!
//! let add = tool(
//!     "add",
//!     "Add two numbers",
//!     json!({"a": "number", "b": "number"}),
//!     |args| async move {
//!         let sum = args["a"].as_f64().unwrap_or(0.0) + args["b"].as_f64().unwrap_or(0.0);
//!         Ok(ToolResult::text(format!("{sum}")))
//!     },
//! );
//!
//! let calculator = create_sdk_mcp_server("calculator", "1.0.0", vec![add]);
//!
//! let mut servers = HashMap::new();
//! servers.insert("calc".to_string(), calculator);
//! let options = ClaudeAgentOptions::builder()
//!     .mcp_servers(McpServers::Dict(servers))
//!     .allowed_tools(vec!["mcp__calc__add".into()])
//!     .build();
//! ```
//!
//! # Input schemas
//!
//! A tool schema may be a full JSON Schema object (anything with both `type`
//! and `properties`) or a flat map of parameter name to primitive type name.
//! See [`to_json_schema`].

pub mod protocol;
pub mod server;
pub mod tool;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{McpServerConfig, SdkMcpServerConfig};

pub use protocol::{JsonRpcRequest, JsonRpcResponse, McpError};
pub use server::SdkMcpServer;
pub use tool::{SdkMcpTool, ToolContent, ToolResult, to_json_schema, tool};

/// Protocol version reported by in-process servers
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Boxed async tool handler
pub type ToolHandler =
    Arc<dyn Fn(serde_json::Value) -> Pin<Box<dyn Future<Output = Result<ToolResult>> + Send>> + Send + Sync>;

/// Bundle tools into a named, versioned in-process server
///
/// The returned config goes into [`crate::types::McpServers::Dict`]; the key it
/// is stored under is the server name the CLI uses (`mcp__<key>__<tool>`).
pub fn create_sdk_mcp_server(
    name: impl Into<String>,
    version: impl Into<String>,
    tools: Vec<SdkMcpTool>,
) -> McpServerConfig {
    let server = SdkMcpServer::new(name).version(version).tools(tools);
    McpServerConfig::Sdk(SdkMcpServerConfig {
        name: server.name().to_string(),
        instance: Arc::new(server),
    })
}
