use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{message} (code {code})")]
    Remote { code: i32, message: String },
    #[error("execution failed: {0}")]
    Execution(String),
}

impl From<mcp::Error> for ToolError {
    fn from(e: mcp::Error) -> Self {
        match e {
            mcp::Error::Remote(remote) => ToolError::Remote {
                code: remote.code,
                message: remote.message,
            },
            other => ToolError::Execution(other.to_string()),
        }
    }
}
