//! Tool-related types.

use super::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Value,
}

/// The result returned to the model after a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResult {
    Success {
        tool_call_id: String,
        output: Value,
    },
    Failure {
        tool_call_id: String,
        error: ToolError,
    },
}

impl ToolResult {
    pub fn tool_call_id(&self) -> &str {
        match self {
            ToolResult::Success { tool_call_id, .. } | ToolResult::Failure { tool_call_id, .. } => {
                tool_call_id
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success { .. })
    }

    /// Render as a `tool_result` content block for the next model turn.
    ///
    /// String outputs are passed through as-is; other values are sent as
    /// their JSON text. Failures carry `is_error` so the model sees them as
    /// errors instead of data.
    pub fn to_content_block(&self) -> Value {
        match self {
            ToolResult::Success {
                tool_call_id,
                output,
            } => {
                let content = match output {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                json!({
                    "type": "tool_result",
                    "tool_use_id": tool_call_id,
                    "content": content,
                })
            }
            ToolResult::Failure {
                tool_call_id,
                error,
            } => json!({
                "type": "tool_result",
                "tool_use_id": tool_call_id,
                "content": format!("Error: {error}"),
                "is_error": true,
            }),
        }
    }
}

/// A tool definition exposed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub schema: Value,
}

impl From<mcp::Tool> for ToolSpec {
    fn from(tool: mcp::Tool) -> Self {
        Self {
            name: tool.name,
            description: tool.description,
            schema: tool.input_schema,
        }
    }
}
