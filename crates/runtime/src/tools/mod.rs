//! Tool execution and MCP integration.

mod batch;
pub mod errors;
mod host;
mod mcp_host;
mod types;

pub use batch::execute_all;
pub use errors::ToolError;
pub use host::ToolHost;
pub use mcp_host::McpToolHost;
pub use types::{ToolCall, ToolResult, ToolSpec};
