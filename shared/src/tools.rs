//! MCP tool definition and result types

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Tool definition as returned by `tools/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for input parameters
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        ToolDefinition {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Definition for a tool that takes no arguments
    pub fn without_params(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(
            name,
            description,
            json!({ "type": "object", "properties": {} }),
        )
    }
}

/// Tool result content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text { text: String },
}

/// Result of a `tools/call`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolResult {
    /// Create a successful text result
    pub fn text(text: impl Into<String>) -> Self {
        ToolResult {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: None,
        }
    }

    /// Create a successful result carrying a JSON-encoded record
    pub fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(text) => ToolResult::text(text),
            Err(e) => ToolResult::error(format!("failed to encode result: {}", e)),
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        ToolResult {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: Some(true),
        }
    }

    /// Concatenated text of all content items
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .map(|c| match c {
                ToolContent::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_result_serialization() {
        let value = serde_json::to_value(ToolResult::text("ok")).unwrap();
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][0]["text"], "ok");
        assert!(value.get("isError").is_none());
    }

    #[test]
    fn test_error_result_flagged() {
        let value = serde_json::to_value(ToolResult::error("boom")).unwrap();
        assert_eq!(value["isError"], true);
    }

    #[test]
    fn test_json_result_is_encoded_record() {
        let result = ToolResult::json(&json!({ "armed": true }));
        let decoded: Value = serde_json::from_str(&result.text_content()).unwrap();
        assert_eq!(decoded["armed"], true);
    }
}
