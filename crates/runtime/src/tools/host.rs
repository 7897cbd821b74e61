//! Tool host trait.

use super::{ToolCall, ToolError, ToolSpec};
use serde_json::Value;
use std::future::Future;

/// Trait for tool execution hosts.
///
/// Implementations provide tool specifications and execute tool calls.
/// This is the boundary between the conversation loop and side effects.
pub trait ToolHost: Send + Sync {
    /// Tools the model may call, in discovery order.
    fn specs(&self) -> &[ToolSpec];

    /// Execute a tool call. Failures are per call and leave the host usable.
    fn execute(&self, call: &ToolCall) -> impl Future<Output = Result<Value, ToolError>> + Send;

    /// Look up a discovered tool by name.
    fn spec(&self, name: &str) -> Option<&ToolSpec> {
        self.specs().iter().find(|spec| spec.name == name)
    }
}
