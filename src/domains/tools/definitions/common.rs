//! Result helpers shared by the tool definitions.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content, JsonObject},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::warn;

use crate::core::error::ErrorKind;

#[cfg(feature = "http")]
use crate::domains::tools::ToolError;

/// A successful result: a human-readable summary plus structured data.
pub fn success<T: Serialize>(summary: impl Into<String>, data: &T) -> CallToolResult {
    match serde_json::to_value(data) {
        Ok(structured) => CallToolResult {
            content: vec![Content::text(summary)],
            structured_content: Some(structured),
            is_error: Some(false),
            meta: None,
        },
        Err(e) => failure(ErrorKind::Internal, format!("cannot serialize result: {e}")),
    }
}

/// A failed result. The text starts with the error kind so callers can tell
/// a conflict from a load error without parsing the message.
pub fn failure(kind: ErrorKind, message: impl std::fmt::Display) -> CallToolResult {
    let message = message.to_string();
    warn!("Tool call failed ({}): {}", kind, message);
    CallToolResult {
        content: vec![Content::text(format!("{kind}: {message}"))],
        structured_content: Some(json!({ "error": kind, "message": message })),
        is_error: Some(true),
        meta: None,
    }
}

/// Deserialize rmcp call arguments into a params struct.
pub fn parse_params<P: DeserializeOwned>(arguments: JsonObject) -> Result<P, McpError> {
    serde_json::from_value(Value::Object(arguments))
        .map_err(|e| McpError::invalid_params(e.to_string(), None))
}

/// Deserialize HTTP call arguments; a missing body counts as `{}`.
#[cfg(feature = "http")]
pub fn parse_http_params<P: DeserializeOwned>(arguments: Value) -> Result<P, ToolError> {
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::invalid_arguments(e.to_string()))
}

/// Serialize the full result so `structuredContent` reaches HTTP clients.
#[cfg(feature = "http")]
pub fn to_http_value(result: &CallToolResult) -> Result<Value, ToolError> {
    serde_json::to_value(result).map_err(|e| ToolError::internal(e.to_string()))
}

#[cfg(test)]
pub(crate) fn text_of(result: &CallToolResult) -> &str {
    match &result.content[0].raw {
        rmcp::model::RawContent::Text(text) => &text.text,
        _ => panic!("Expected text content"),
    }
}
