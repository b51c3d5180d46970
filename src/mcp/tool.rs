//! Tool declarations for in-process MCP servers

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::future::Future;
use std::sync::Arc;

use super::ToolHandler;
use crate::error::Result;

/// A tool served by an in-process MCP server
pub struct SdkMcpTool {
    name: String,
    description: String,
    input_schema: Value,
    handler: ToolHandler,
}

impl SdkMcpTool {
    /// Declare a tool
    ///
    /// `input_schema` is either a JSON Schema object or a flat
    /// `{"param": "type"}` map; see [`to_json_schema`].
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResult>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler: Arc::new(move |input| Box::pin(handler(input))),
        }
    }

    /// Tool name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tool description
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Schema as declared
    #[must_use]
    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// Run the handler
    ///
    /// # Errors
    /// Propagates the handler's error.
    pub async fn invoke(&self, arguments: Value) -> Result<ToolResult> {
        (self.handler)(arguments).await
    }

    /// Catalog entry for `tools/list`
    pub(crate) fn to_tool_info(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": to_json_schema(&self.input_schema),
        })
    }
}

impl std::fmt::Debug for SdkMcpTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkMcpTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish_non_exhaustive()
    }
}

/// Declare a tool; shorthand for [`SdkMcpTool::new`]
pub fn tool<F, Fut>(
    name: impl Into<String>,
    description: impl Into<String>,
    input_schema: Value,
    handler: F,
) -> SdkMcpTool
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ToolResult>> + Send + 'static,
{
    SdkMcpTool::new(name, description, input_schema, handler)
}

/// Normalize a declared input schema into JSON Schema
///
/// - An object that has both `type` and `properties` is used as-is.
/// - Any other object is read as `name -> type name` and becomes an object
///   schema with every parameter required. `string`/`str`, `integer`/`int`,
///   `number`/`float`, and `boolean`/`bool` map to their JSON Schema types;
///   anything else becomes `string`.
/// - A non-object yields an empty object schema.
#[must_use]
pub fn to_json_schema(schema: &Value) -> Value {
    let Some(fields) = schema.as_object() else {
        return json!({"type": "object", "properties": {}});
    };
    if fields.contains_key("type") && fields.contains_key("properties") {
        return schema.clone();
    }

    let mut properties = Map::new();
    let mut required = Vec::with_capacity(fields.len());
    for (name, declared) in fields {
        let json_type = match declared.as_str() {
            Some("integer" | "int") => "integer",
            Some("number" | "float") => "number",
            Some("boolean" | "bool") => "boolean",
            _ => "string",
        };
        properties.insert(name.clone(), json!({ "type": json_type }));
        required.push(Value::String(name.clone()));
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Result returned by a tool handler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Content items
    pub content: Vec<ToolContent>,
    /// Whether the tool failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolResult {
    /// Single text item
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: None,
        }
    }

    /// Single text item flagged as an error
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: Some(true),
        }
    }

    /// Wire form of a `tools/call` result; `is_error` appears only when set
    #[must_use]
    pub fn to_wire(&self) -> Value {
        let content: Vec<Value> = self.content.iter().map(ToolContent::to_wire).collect();
        let mut result = json!({ "content": content });
        if self.is_error == Some(true) {
            result["is_error"] = Value::Bool(true);
        }
        result
    }
}

/// Content item of a tool result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content
    Text {
        /// The text
        text: String,
    },
    /// Base64 image content
    Image {
        /// Base64 data
        data: String,
        /// MIME type
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

impl ToolContent {
    fn to_wire(&self) -> Value {
        match self {
            Self::Text { text } => json!({ "type": "text", "text": text }),
            Self::Image { data, mime_type } => {
                json!({ "type": "image", "data": data, "mimeType": mime_type })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_map_becomes_required_object_schema() {
        let schema = to_json_schema(&json!({
            "name": "string",
            "count": "int",
            "ratio": "float",
            "verbose": "bool",
            "tags": "list"
        }));
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["name"], json!({"type": "string"}));
        assert_eq!(schema["properties"]["count"], json!({"type": "integer"}));
        assert_eq!(schema["properties"]["ratio"], json!({"type": "number"}));
        assert_eq!(schema["properties"]["verbose"], json!({"type": "boolean"}));
        assert_eq!(schema["properties"]["tags"], json!({"type": "string"}));

        let mut required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        required.sort_unstable();
        assert_eq!(required, vec!["count", "name", "ratio", "tags", "verbose"]);
    }

    #[test]
    fn test_full_schema_passes_through() {
        let declared = json!({
            "type": "object",
            "properties": {"path": {"type": "string", "description": "File path"}},
            "required": []
        });
        assert_eq!(to_json_schema(&declared), declared);
    }

    #[test]
    fn test_non_object_schema() {
        assert_eq!(
            to_json_schema(&Value::Null),
            json!({"type": "object", "properties": {}})
        );
    }

    #[test]
    fn test_result_wire_format() {
        assert_eq!(
            ToolResult::text("hi").to_wire(),
            json!({"content": [{"type": "text", "text": "hi"}]})
        );
        assert_eq!(
            ToolResult::error("boom").to_wire(),
            json!({"content": [{"type": "text", "text": "boom"}], "is_error": true})
        );

        let image = ToolResult {
            content: vec![ToolContent::Image {
                data: "iVBORw0KGgo=".to_string(),
                mime_type: "image/png".to_string(),
            }],
            is_error: Some(false),
        };
        assert_eq!(
            image.to_wire(),
            json!({"content": [{"type": "image", "data": "iVBORw0KGgo=", "mimeType": "image/png"}]})
        );
    }

    #[tokio::test]
    async fn test_tool_invocation() {
        let echo = tool("echo", "Echo text", json!({"text": "string"}), |input| async move {
            Ok(ToolResult::text(input["text"].as_str().unwrap_or_default()))
        });

        let result = echo.invoke(json!({"text": "hello"})).await.unwrap();
        assert!(matches!(&result.content[0], ToolContent::Text { text } if text == "hello"));
        assert_eq!(echo.to_tool_info()["inputSchema"]["required"], json!(["text"]));
    }
}
