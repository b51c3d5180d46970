//! MCP (Model Context Protocol) server configuration types
//!
//! External servers (stdio, SSE, HTTP) are handed to the CLI through
//! `--mcp-config`. In-process servers ([`McpServerConfig::Sdk`]) are announced
//! to the CLI by name only; their tool calls come back over the control
//! protocol as `mcp_message` requests.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::mcp::SdkMcpServer;

// ============================================================================
// MCP Server Types
// ============================================================================

/// MCP stdio server configuration
///
/// Used to spawn an MCP server as a subprocess.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpStdioServerConfig {
    /// Server type (stdio)
    #[serde(skip_serializing_if = "Option::is_none", rename = "type")]
    pub server_type: Option<String>,
    /// Command to execute
    pub command: String,
    /// Command arguments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    /// Environment variables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<HashMap<String, String>>,
}

/// MCP SSE server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpSseServerConfig {
    /// Server type (sse)
    #[serde(rename = "type")]
    pub server_type: String,
    /// Server URL
    pub url: String,
    /// HTTP headers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
}

/// MCP HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpHttpServerConfig {
    /// Server type (http)
    #[serde(rename = "type")]
    pub server_type: String,
    /// Server URL
    pub url: String,
    /// HTTP headers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
}

/// In-process SDK MCP server
///
/// Build one with [`crate::mcp::create_sdk_mcp_server`].
#[derive(Debug, Clone)]
pub struct SdkMcpServerConfig {
    /// Server name (used as identifier by the CLI)
    pub name: String,
    /// The bridge answering requests for this server
    pub instance: Arc<SdkMcpServer>,
}

/// MCP server configuration enum
#[derive(Debug, Clone)]
pub enum McpServerConfig {
    /// Stdio-based MCP server (spawns subprocess)
    Stdio(McpStdioServerConfig),
    /// SSE-based MCP server (connects via Server-Sent Events)
    Sse(McpSseServerConfig),
    /// HTTP-based MCP server (connects via HTTP)
    Http(McpHttpServerConfig),
    /// In-process MCP server served over the control protocol
    Sdk(SdkMcpServerConfig),
}

impl McpServerConfig {
    /// JSON form written into `--mcp-config`
    ///
    /// SDK servers are reduced to `{type: "sdk", name}`; the instance never
    /// leaves the process.
    ///
    /// # Errors
    /// Returns error if an external server config cannot be serialized.
    pub fn to_cli_json(&self) -> crate::Result<serde_json::Value> {
        let value = match self {
            Self::Stdio(config) => serde_json::to_value(config),
            Self::Sse(config) => serde_json::to_value(config),
            Self::Http(config) => serde_json::to_value(config),
            Self::Sdk(config) => {
                return Ok(serde_json::json!({ "type": "sdk", "name": config.name }));
            }
        };
        value.map_err(|e| crate::ClaudeError::json_encode(e.to_string()))
    }
}

/// MCP servers container
///
/// Specifies how MCP servers are configured for a session.
#[derive(Debug, Clone, Default)]
pub enum McpServers {
    /// No MCP servers
    #[default]
    None,
    /// Dictionary of MCP servers (inline configuration)
    Dict(HashMap<String, McpServerConfig>),
    /// Path to MCP servers configuration file
    Path(PathBuf),
}

impl McpServers {
    /// In-process servers keyed by their configured name
    #[must_use]
    pub fn sdk_servers(&self) -> HashMap<String, Arc<SdkMcpServer>> {
        match self {
            Self::Dict(servers) => servers
                .iter()
                .filter_map(|(name, config)| match config {
                    McpServerConfig::Sdk(sdk) => Some((name.clone(), Arc::clone(&sdk.instance))),
                    _ => None,
                })
                .collect(),
            Self::None | Self::Path(_) => HashMap::new(),
        }
    }
}
