//! Tool runtime: the boundary between a conversation loop and tool servers.
//!
//! A conversation loop extracts `(id, name, input)` tool calls from a model
//! turn, hands them to a [`ToolHost`], and feeds each [`ToolResult`] back to
//! the model as a `tool_result` block. [`McpToolHost`] forwards calls to a
//! server subprocess over the `mcp` crate's client.
//!
//! # Example
//!
//! ```no_run
//! use mcp::{ClientOptions, ServerConfig};
//! use runtime::{McpToolHost, ToolCall, execute_all};
//!
//! # async fn example() -> runtime::Result<()> {
//! let config = ServerConfig::new("clock", "toolpipe").arg("serve");
//! let host = McpToolHost::spawn(config, ClientOptions::default()).await?;
//!
//! let calls = vec![ToolCall {
//!     id: "toolu_01".to_string(),
//!     name: "get_current_time".to_string(),
//!     input: serde_json::json!({}),
//! }];
//! for result in execute_all(&host, &calls).await {
//!     println!("{}", result.to_content_block());
//! }
//!
//! host.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod error;
pub mod tools;

pub use error::{Error, Result};
pub use tools::{
    McpToolHost, ToolCall, ToolError, ToolHost, ToolResult, ToolSpec, execute_all,
};
