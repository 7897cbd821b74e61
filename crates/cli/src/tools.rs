//! Built-in tools served by `toolpipe serve`.

use chrono::Local;
use mcp::{RegistryError, ToolRegistry, empty_object_schema};
use serde_json::Value;

pub const GET_CURRENT_TIME: &str = "get_current_time";

/// Output format of `get_current_time`.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Local wall-clock time, e.g. `2025-03-26 14:05:09`.
pub fn current_time() -> String {
    Local::now().format(TIME_FORMAT).to_string()
}

/// Registry holding every built-in tool.
pub fn registry() -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    registry.register_fn(
        GET_CURRENT_TIME,
        "Get the current date and time",
        empty_object_schema(),
        |_| Ok(Value::String(current_time())),
    )?;
    Ok(registry)
}
