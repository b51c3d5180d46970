//! Wire types of the control protocol
//!
//! Every line on the transport is either content or one of three control
//! envelopes:
//!
//! ```text
//! {"type": "control_request",  "request_id": "...", "request":  {"subtype": ..., ...}}
//! {"type": "control_response", "response": {"subtype": "success", "request_id": "...", "response": {...}}}
//! {"type": "control_response", "response": {"subtype": "error",   "request_id": "...", "error": "..."}}
//! {"type": "control_cancel_request", ...}
//! ```
//!
//! Requests flow both ways: the SDK sends `initialize`, `interrupt` and
//! `set_permission_mode`; the CLI sends `can_use_tool`, `hook_callback` and
//! `mcp_message`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{ClaudeError, Result};
use crate::types::PermissionMode;

/// Request sent from the SDK to the CLI
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum OutboundRequest {
    /// Handshake; carries the hook configuration (callback IDs only)
    Initialize {
        /// `{event: [{matcher, hookCallbackIds}]}` or null
        hooks: Option<Value>,
    },
    /// Stop the current turn
    Interrupt,
    /// Change the permission mode mid-session
    SetPermissionMode {
        /// New mode
        mode: PermissionMode,
    },
}

impl OutboundRequest {
    /// Wire subtype
    #[must_use]
    pub fn subtype(&self) -> &'static str {
        match self {
            Self::Initialize { .. } => "initialize",
            Self::Interrupt => "interrupt",
            Self::SetPermissionMode { .. } => "set_permission_mode",
        }
    }

    /// Encode as a `control_request` line
    ///
    /// # Errors
    /// Returns `JsonEncode` if the payload cannot be serialized.
    pub fn to_line(&self, request_id: &str) -> Result<String> {
        let request = serde_json::to_value(self).map_err(|e| ClaudeError::json_encode(e.to_string()))?;
        let envelope = json!({
            "type": "control_request",
            "request_id": request_id,
            "request": request,
        });
        Ok(format!("{envelope}\n"))
    }
}

/// `can_use_tool` payload
#[derive(Debug, Clone, Deserialize)]
pub struct PermissionRequest {
    /// Tool Claude wants to run
    pub tool_name: String,
    /// Proposed tool input
    pub input: Value,
    /// Permission updates the CLI proposes
    #[serde(default)]
    pub permission_suggestions: Option<Vec<Value>>,
    /// Path that triggered the prompt, if any
    #[serde(default)]
    pub blocked_path: Option<String>,
}

/// `hook_callback` payload
#[derive(Debug, Clone, Deserialize)]
pub struct HookCallbackRequest {
    /// ID assigned at `initialize`
    pub callback_id: String,
    /// Hook input, forwarded as-is
    #[serde(default)]
    pub input: Value,
    /// Tool use the hook relates to
    #[serde(default)]
    pub tool_use_id: Option<String>,
}

/// `mcp_message` payload
#[derive(Debug, Clone, Deserialize)]
pub struct McpMessageRequest {
    /// Key of the in-process server in `mcp_servers`
    #[serde(default)]
    pub server_name: Option<String>,
    /// JSON-RPC message for that server
    #[serde(default)]
    pub message: Option<Value>,
}

/// Request sent from the CLI to the SDK
#[derive(Debug, Clone)]
pub enum InboundRequest {
    /// Permission decision for a tool call
    CanUseTool(PermissionRequest),
    /// Invocation of a registered hook
    HookCallback(HookCallbackRequest),
    /// JSON-RPC message for an in-process MCP server
    McpMessage(McpMessageRequest),
}

impl InboundRequest {
    /// Decode the `request` object of a `control_request`
    ///
    /// # Errors
    /// Returns `ControlProtocol` for an unknown subtype or missing fields.
    pub fn parse(request: Value) -> Result<Self> {
        let subtype = request
            .get("subtype")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let decode = |e: serde_json::Error| {
            ClaudeError::control_protocol(format!("Invalid {subtype} request: {e}"))
        };
        match subtype.as_str() {
            "can_use_tool" => serde_json::from_value(request).map(Self::CanUseTool).map_err(decode),
            "hook_callback" => serde_json::from_value(request).map(Self::HookCallback).map_err(decode),
            "mcp_message" => serde_json::from_value(request).map(Self::McpMessage).map_err(decode),
            other => Err(ClaudeError::control_protocol(format!(
                "Unsupported control request subtype: {other}"
            ))),
        }
    }
}

/// Answer to an inbound request
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "subtype", rename_all = "lowercase")]
pub enum ControlResponse {
    /// Handler succeeded
    Success {
        /// Correlation ID of the request
        request_id: String,
        /// Handler result
        response: Value,
    },
    /// Handler failed
    Error {
        /// Correlation ID of the request
        request_id: String,
        /// Failure description
        error: String,
    },
}

impl ControlResponse {
    /// Successful answer
    #[must_use]
    pub fn success(request_id: impl Into<String>, response: Value) -> Self {
        Self::Success {
            request_id: request_id.into(),
            response,
        }
    }

    /// Failed answer
    #[must_use]
    pub fn error(request_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Error {
            request_id: request_id.into(),
            error: error.into(),
        }
    }

    /// Encode as a `control_response` line
    ///
    /// # Errors
    /// Returns `JsonEncode` if the payload cannot be serialized.
    pub fn to_line(&self) -> Result<String> {
        let response = serde_json::to_value(self).map_err(|e| ClaudeError::json_encode(e.to_string()))?;
        let envelope = json!({ "type": "control_response", "response": response });
        Ok(format!("{envelope}\n"))
    }
}

/// One decoded line, classified by routing destination
#[derive(Debug)]
pub enum Incoming {
    /// Answer to one of our requests
    Response {
        /// Correlation ID
        request_id: String,
        /// Payload (`{}` if absent) or the error the CLI reported
        outcome: Result<Value>,
    },
    /// Request from the CLI
    Request {
        /// Correlation ID to answer with
        request_id: String,
        /// The `request` object
        request: Value,
    },
    /// Cancellation of an inbound request
    Cancel(Value),
    /// Control envelope that cannot be routed
    Malformed {
        /// Envelope type
        kind: &'static str,
        /// Original line
        message: Value,
    },
    /// Anything else, destined for the caller
    Content(Value),
}

impl Incoming {
    /// Route a decoded line
    #[must_use]
    pub fn classify(message: Value) -> Self {
        match message.get("type").and_then(Value::as_str) {
            Some("control_response") => Self::response(message),
            Some("control_request") => {
                let request_id = message.get("request_id").and_then(Value::as_str);
                match (request_id, message.get("request")) {
                    (Some(id), Some(request)) if request.is_object() => Self::Request {
                        request_id: id.to_string(),
                        request: request.clone(),
                    },
                    _ => Self::Malformed {
                        kind: "control_request",
                        message,
                    },
                }
            }
            Some("control_cancel_request") => Self::Cancel(message),
            _ => Self::Content(message),
        }
    }

    fn response(message: Value) -> Self {
        let Some(response) = message.get("response").and_then(Value::as_object) else {
            return Self::Malformed {
                kind: "control_response",
                message,
            };
        };
        let Some(request_id) = response.get("request_id").and_then(Value::as_str) else {
            return Self::Malformed {
                kind: "control_response",
                message,
            };
        };

        let outcome = if response.get("subtype").and_then(Value::as_str) == Some("error") {
            let error = response
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error");
            Err(ClaudeError::control_request_failed(error))
        } else {
            Ok(match response.get("response") {
                Some(payload @ Value::Object(_)) => payload.clone(),
                _ => Value::Object(Map::new()),
            })
        };

        Self::Response {
            request_id: request_id.to_string(),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_encoding() {
        let line = OutboundRequest::Interrupt.to_line("req_1_0a0b0c0d").unwrap();
        assert!(line.ends_with('\n'));
        let value: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "control_request",
                "request_id": "req_1_0a0b0c0d",
                "request": {"subtype": "interrupt"}
            })
        );

        let mode = serde_json::to_value(OutboundRequest::SetPermissionMode {
            mode: PermissionMode::AcceptEdits,
        })
        .unwrap();
        assert_eq!(mode, json!({"subtype": "set_permission_mode", "mode": "acceptEdits"}));

        let init = serde_json::to_value(OutboundRequest::Initialize { hooks: None }).unwrap();
        assert_eq!(init, json!({"subtype": "initialize", "hooks": null}));
    }

    #[test]
    fn test_inbound_parsing() {
        let request = InboundRequest::parse(json!({
            "subtype": "can_use_tool",
            "tool_name": "Bash",
            "input": {"command": "ls"},
            "permission_suggestions": null
        }))
        .unwrap();
        let InboundRequest::CanUseTool(request) = request else {
            panic!("expected can_use_tool");
        };
        assert_eq!(request.tool_name, "Bash");
        assert!(request.permission_suggestions.is_none());

        let request = InboundRequest::parse(json!({
            "subtype": "hook_callback",
            "callback_id": "hook_0",
            "input": {"hook_event_name": "PreToolUse"}
        }))
        .unwrap();
        assert!(matches!(request, InboundRequest::HookCallback(r) if r.callback_id == "hook_0"));

        let request = InboundRequest::parse(json!({"subtype": "mcp_message"})).unwrap();
        assert!(matches!(request, InboundRequest::McpMessage(r) if r.server_name.is_none()));
    }

    #[test]
    fn test_unsupported_subtype() {
        let err = InboundRequest::parse(json!({"subtype": "rewind_files"})).unwrap_err();
        assert!(err.to_string().contains("Unsupported control request subtype: rewind_files"));
    }

    #[test]
    fn test_response_encoding() {
        let line = ControlResponse::error("req_7", "boom").to_line().unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "control_response",
                "response": {"subtype": "error", "request_id": "req_7", "error": "boom"}
            })
        );

        let line = ControlResponse::success("req_8", json!({"allow": true})).to_line().unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["response"]["subtype"], "success");
        assert_eq!(value["response"]["response"], json!({"allow": true}));
    }

    #[test]
    fn test_classify() {
        let incoming = Incoming::classify(json!({
            "type": "control_response",
            "response": {"subtype": "success", "request_id": "req_1_ab"}
        }));
        assert!(matches!(
            incoming,
            Incoming::Response { ref request_id, outcome: Ok(ref v) } if request_id == "req_1_ab" && *v == json!({})
        ));

        let incoming = Incoming::classify(json!({
            "type": "control_response",
            "response": {"subtype": "error", "request_id": "req_2_ab", "error": "no such mode"}
        }));
        let Incoming::Response { outcome: Err(err), .. } = incoming else {
            panic!("expected error response");
        };
        assert!(matches!(err, ClaudeError::ControlRequestFailed(ref m) if m == "no such mode"));

        assert!(matches!(
            Incoming::classify(json!({"type": "control_request", "request_id": "x", "request": {"subtype": "can_use_tool"}})),
            Incoming::Request { .. }
        ));
        assert!(matches!(
            Incoming::classify(json!({"type": "control_request", "request": {}})),
            Incoming::Malformed { kind: "control_request", .. }
        ));
        assert!(matches!(
            Incoming::classify(json!({"type": "control_cancel_request", "request_id": "x"})),
            Incoming::Cancel(_)
        ));
        assert!(matches!(
            Incoming::classify(json!({"type": "assistant", "message": {}})),
            Incoming::Content(_)
        ));
    }
}
