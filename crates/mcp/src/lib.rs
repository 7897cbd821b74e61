//! Line-delimited JSON-RPC tool protocol over child-process pipes.
//!
//! The client side launches a server subprocess and talks to it over its
//! stdin/stdout, one JSON document per line. The server side reads request
//! lines, dispatches them to a tool registry, and writes one response line
//! per request.
//!
//! # Example
//!
//! ```no_run
//! use mcp::{Client, ServerConfig};
//! use serde_json::Map;
//!
//! # async fn example() -> mcp::Result<()> {
//! let config = ServerConfig::new("clock", "toolpipe").arg("serve");
//!
//! let client = Client::spawn(config).await?;
//! client.initialize().await?;
//!
//! for tool in client.list_tools().await? {
//!     println!("Tool: {}", tool.name);
//! }
//!
//! let now = client.call_tool("get_current_time", Map::new()).await?;
//! println!("{now}");
//!
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
pub mod framing;
pub mod protocol;
mod registry;
mod server;
mod transport;

pub use client::{Client, ClientOptions};
pub use error::{Error, RegistryError, Result, ToolError};
pub use protocol::{
    CallToolParams, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, PROTOCOL_VERSION, RequestId, ServerInfo, ServerResponse, Tool,
};
pub use registry::{ToolHandler, ToolRegistry, empty_object_schema, object_schema};
pub use server::{ServeStats, Server, ServerState};
pub use transport::{SHUTDOWN_GRACE, ServerConfig, Transport};
