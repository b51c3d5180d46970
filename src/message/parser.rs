//! Message parser for CLI stream-json output

use serde_json::Value;

use crate::error::{ClaudeError, Result};
use crate::types::Message;

const KNOWN_TYPES: [&str; 4] = ["user", "assistant", "system", "result"];

/// Parse a raw content message into a typed [`Message`]
///
/// # Errors
/// Returns `ClaudeError::MessageParse` carrying the raw data when the value is
/// not an object, has no `type`, has an unknown `type`, or lacks a field its
/// kind requires.
pub fn parse_message(data: Value) -> Result<Message> {
    let Some(object) = data.as_object() else {
        return Err(ClaudeError::message_parse(
            format!("Invalid message data type (expected object, got {data})"),
            Some(data),
        ));
    };

    let Some(kind) = object.get("type").and_then(Value::as_str) else {
        return Err(ClaudeError::message_parse(
            "Message missing 'type' field",
            Some(data),
        ));
    };

    if !KNOWN_TYPES.contains(&kind) {
        let message = format!("Unknown message type: {kind}");
        return Err(ClaudeError::message_parse(message, Some(data)));
    }

    let kind = kind.to_string();
    serde_json::from_value(data.clone()).map_err(|e| {
        ClaudeError::message_parse(
            format!("Missing required field in {kind} message: {e}"),
            Some(data),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentBlock, UserContent};
    use serde_json::json;

    #[test]
    fn test_parse_user_message() {
        let data = json!({
            "type": "user",
            "message": {
                "role": "user",
                "content": "Hello, Claude!"
            }
        });

        match parse_message(data).unwrap() {
            Message::User { message, .. } => {
                assert!(matches!(message.content, Some(UserContent::String(s)) if s == "Hello, Claude!"));
            }
            other => panic!("expected user message, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_assistant_with_tool_use() {
        let data = json!({
            "type": "assistant",
            "message": {
                "model": "claude-opus-4-1",
                "content": [
                    {"type": "text", "text": "Running it"},
                    {"type": "tool_use", "id": "toolu_1", "name": "Bash", "input": {"command": "ls"}}
                ]
            }
        });

        match parse_message(data).unwrap() {
            Message::Assistant { message, .. } => {
                assert_eq!(message.model, "claude-opus-4-1");
                assert!(matches!(&message.content[1], ContentBlock::ToolUse { name, .. } if name == "Bash"));
            }
            other => panic!("expected assistant message, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_result_message() {
        let data = json!({
            "type": "result",
            "subtype": "success",
            "duration_ms": 1200,
            "duration_api_ms": 900,
            "is_error": false,
            "num_turns": 1,
            "session_id": "default",
            "total_cost_usd": 0.0012,
            "result": "4"
        });

        let message = parse_message(data).unwrap();
        assert!(message.is_result());
        assert_eq!(message.kind(), "result");
    }

    #[test]
    fn test_missing_type() {
        let err = parse_message(json!({"message": {}})).unwrap_err();
        assert!(err.to_string().contains("Message missing 'type' field"));
    }

    #[test]
    fn test_unknown_type() {
        let err = parse_message(json!({"type": "invalid_type", "data": "some data"})).unwrap_err();
        match err {
            ClaudeError::MessageParse { message, data } => {
                assert_eq!(message, "Unknown message type: invalid_type");
                assert!(data.is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_required_field() {
        let err = parse_message(json!({"type": "assistant", "message": {"content": []}})).unwrap_err();
        assert!(err
            .to_string()
            .contains("Missing required field in assistant message"));
    }

    #[test]
    fn test_non_object() {
        assert!(parse_message(json!([1, 2, 3])).is_err());
    }
}
