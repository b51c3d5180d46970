//! JSON-RPC message types spoken by in-process MCP servers

use serde::{Deserialize, Serialize};
use serde_json::Value;

fn jsonrpc_version() -> String {
    "2.0".to_string()
}

/// JSON-RPC request or notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (always "2.0")
    #[serde(default = "jsonrpc_version")]
    pub jsonrpc: String,
    /// Request ID (absent for notifications)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Method name
    pub method: String,
    /// Method parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// JSON-RPC response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,
    /// ID of the request this answers; omitted for notification acks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Result (present on success)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error (present on failure)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

impl JsonRpcResponse {
    /// Create a successful response
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id: Some(id.unwrap_or(Value::Null)),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<Value>, error: McpError) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id: Some(id.unwrap_or(Value::Null)),
            result: None,
            error: Some(error),
        }
    }

    /// Empty success without an ID, used to acknowledge notifications
    #[must_use]
    pub fn ack() -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id: None,
            result: Some(Value::Object(serde_json::Map::new())),
            error: None,
        }
    }

    /// Convert to the JSON sent back inside `mcp_response`
    #[must_use]
    pub fn into_value(self) -> Value {
        serde_json::to_value(&self).unwrap_or_else(|e| {
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": self.id,
                "error": {"code": McpError::INTERNAL_ERROR, "message": e.to_string()},
            })
        })
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpError {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Additional error data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl McpError {
    /// Invalid request
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method (or server) not found
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Internal error
    pub const INTERNAL_ERROR: i32 = -32603;

    fn new(code: i32, message: String) -> Self {
        Self {
            code,
            message,
            data: None,
        }
    }

    /// The message was not a JSON-RPC request
    #[must_use]
    pub fn invalid_request(message: String) -> Self {
        Self::new(Self::INVALID_REQUEST, message)
    }

    /// Unsupported method
    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self::new(Self::METHOD_NOT_FOUND, format!("Method '{method}' not found"))
    }

    /// No in-process server with that name
    #[must_use]
    pub fn server_not_found(server: &str) -> Self {
        Self::new(Self::METHOD_NOT_FOUND, format!("Server '{server}' not found"))
    }

    /// Failure inside the server
    #[must_use]
    pub fn internal_error(message: String) -> Self {
        Self::new(Self::INTERNAL_ERROR, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_without_version_or_id() {
        let request: JsonRpcRequest =
            serde_json::from_value(json!({"method": "notifications/initialized"})).unwrap();
        assert_eq!(request.jsonrpc, "2.0");
        assert!(request.id.is_none());
        assert!(request.params.is_none());
    }

    #[test]
    fn test_error_keeps_null_id() {
        let response = JsonRpcResponse::error(None, McpError::method_not_found("resources/list"));
        assert_eq!(
            response.into_value(),
            json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": {"code": -32601, "message": "Method 'resources/list' not found"}
            })
        );
    }

    #[test]
    fn test_ack_has_no_id() {
        assert_eq!(
            JsonRpcResponse::ack().into_value(),
            json!({"jsonrpc": "2.0", "result": {}})
        );
    }
}
