//! In-process MCP server

use serde_json::{Value, json};
use tracing::debug;

use super::MCP_PROTOCOL_VERSION;
use super::protocol::{JsonRpcRequest, JsonRpcResponse, McpError};
use super::tool::{SdkMcpTool, ToolResult};

/// A named, versioned set of tools answered in-process
///
/// Servers are shared with the control handler behind an `Arc`; requests are
/// handled through `&self`.
pub struct SdkMcpServer {
    name: String,
    version: String,
    tools: Vec<SdkMcpTool>,
}

impl SdkMcpServer {
    /// Create a server with no tools (version `1.0.0`)
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "1.0.0".to_string(),
            tools: Vec::new(),
        }
    }

    /// Set the reported version
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Add one tool
    #[must_use]
    pub fn tool(mut self, tool: SdkMcpTool) -> Self {
        self.tools.push(tool);
        self
    }

    /// Add several tools
    #[must_use]
    pub fn tools(mut self, tools: Vec<SdkMcpTool>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Server name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reported version
    #[must_use]
    pub fn server_version(&self) -> &str {
        &self.version
    }

    /// Find a tool by name
    #[must_use]
    pub fn get_tool(&self, name: &str) -> Option<&SdkMcpTool> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    /// Tool catalog as returned by `tools/list`
    #[must_use]
    pub fn list_tools(&self) -> Vec<Value> {
        self.tools.iter().map(SdkMcpTool::to_tool_info).collect()
    }

    /// Answer one JSON-RPC message
    ///
    /// Never fails: protocol problems and tool failures are encoded in the
    /// returned JSON-RPC response.
    pub async fn handle_message(&self, message: Value) -> Value {
        let request: JsonRpcRequest = match serde_json::from_value(message) {
            Ok(request) => request,
            Err(e) => {
                return JsonRpcResponse::error(
                    None,
                    McpError::invalid_request(format!("Invalid JSON-RPC request: {e}")),
                )
                .into_value();
            }
        };

        debug!(server = %self.name, method = %request.method, "Handling MCP request");

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(
                request.id,
                json!({
                    "protocolVersion": MCP_PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": { "name": self.name, "version": self.version },
                }),
            ),
            "tools/list" => JsonRpcResponse::success(request.id, json!({ "tools": self.list_tools() })),
            "tools/call" => self.call_tool(request.id, request.params).await,
            "notifications/initialized" => JsonRpcResponse::ack(),
            other => JsonRpcResponse::error(request.id, McpError::method_not_found(other)),
        };
        response.into_value()
    }

    async fn call_tool(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params = params.unwrap_or(Value::Null);
        let Some(tool_name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::error(
                id,
                McpError::internal_error("tools/call requires a tool name".to_string()),
            );
        };
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));

        let Some(tool) = self.get_tool(tool_name) else {
            return JsonRpcResponse::success(
                id,
                ToolResult::error(format!("Tool '{tool_name}' not found")).to_wire(),
            );
        };

        let result = match tool.invoke(arguments).await {
            Ok(result) => result,
            Err(e) => {
                debug!(server = %self.name, tool = tool_name, error = %e, "Tool handler failed");
                ToolResult::error(e.to_string())
            }
        };
        JsonRpcResponse::success(id, result.to_wire())
    }
}

impl std::fmt::Debug for SdkMcpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkMcpServer")
            .field("name", &self.name)
            .field("version", &self.version)
            .field(
                "tools",
                &self.tools.iter().map(SdkMcpTool::name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClaudeError;
    use crate::mcp::tool;

    fn echo_server() -> SdkMcpServer {
        SdkMcpServer::new("test")
            .version("0.3.0")
            .tool(tool("echo", "Echo text back", json!({"text": "string"}), |args| async move {
                Ok(ToolResult::text(args["text"].as_str().unwrap_or_default()))
            }))
            .tool(tool("fail", "Always fails", json!({}), |_args| async {
                Err(ClaudeError::mcp("disk on fire"))
            }))
    }

    #[tokio::test]
    async fn test_initialize() {
        let response = echo_server()
            .handle_message(json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}))
            .await;
        assert_eq!(
            response,
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "protocolVersion": "2024-11-05",
                    "capabilities": {"tools": {}},
                    "serverInfo": {"name": "test", "version": "0.3.0"}
                }
            })
        );
    }

    #[tokio::test]
    async fn test_tools_list() {
        let response = echo_server()
            .handle_message(json!({"jsonrpc": "2.0", "id": "a", "method": "tools/list"}))
            .await;
        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0]["name"], "echo");
        assert_eq!(tools[0]["description"], "Echo text back");
        assert_eq!(
            tools[0]["inputSchema"],
            json!({"type": "object", "properties": {"text": {"type": "string"}}, "required": ["text"]})
        );
    }

    #[tokio::test]
    async fn test_tools_call_echo() {
        let response = echo_server()
            .handle_message(json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "tools/call",
                "params": {"name": "echo", "arguments": {"text": "hi"}}
            }))
            .await;
        assert_eq!(response["id"], 2);
        assert_eq!(
            response["result"],
            json!({"content": [{"type": "text", "text": "hi"}]})
        );
    }

    #[tokio::test]
    async fn test_tools_call_unknown_tool() {
        let response = echo_server()
            .handle_message(json!({
                "jsonrpc": "2.0",
                "id": 3,
                "method": "tools/call",
                "params": {"name": "unknown", "arguments": {}}
            }))
            .await;
        assert!(response.get("error").is_none());
        assert_eq!(response["result"]["is_error"], true);
        assert_eq!(
            response["result"]["content"][0]["text"],
            "Tool 'unknown' not found"
        );
    }

    #[tokio::test]
    async fn test_tools_call_handler_error() {
        let response = echo_server()
            .handle_message(json!({
                "jsonrpc": "2.0",
                "id": 4,
                "method": "tools/call",
                "params": {"name": "fail"}
            }))
            .await;
        assert_eq!(response["result"]["is_error"], true);
        assert!(
            response["result"]["content"][0]["text"]
                .as_str()
                .unwrap()
                .contains("disk on fire")
        );
    }

    #[tokio::test]
    async fn test_tools_call_without_name() {
        let response = echo_server()
            .handle_message(json!({"jsonrpc": "2.0", "id": 5, "method": "tools/call", "params": {}}))
            .await;
        assert_eq!(response["error"]["code"], McpError::INTERNAL_ERROR);
    }

    #[tokio::test]
    async fn test_initialized_notification_is_acked() {
        let response = echo_server()
            .handle_message(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await;
        assert_eq!(response, json!({"jsonrpc": "2.0", "result": {}}));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = echo_server()
            .handle_message(json!({"jsonrpc": "2.0", "id": 6, "method": "resources/list"}))
            .await;
        assert_eq!(response["id"], 6);
        assert_eq!(response["error"]["code"], -32601);
        assert_eq!(response["error"]["message"], "Method 'resources/list' not found");
    }

    #[tokio::test]
    async fn test_not_a_request() {
        let response = echo_server().handle_message(json!([1, 2, 3])).await;
        assert_eq!(response["error"]["code"], McpError::INVALID_REQUEST);
    }
}
