//! Tool registry for the server role.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::error::{RegistryError, ToolError};
use crate::protocol::Tool;

/// A callable tool.
///
/// `call` runs synchronously on the dispatch loop, so a slow tool stalls
/// every request behind it.
pub trait ToolHandler: Send + Sync {
    /// The descriptor published through `tools/list`.
    fn descriptor(&self) -> Tool;

    /// Execute the tool with the client-supplied input.
    fn call(&self, input: Map<String, Value>) -> Result<Value, ToolError>;
}

struct FnTool<F> {
    descriptor: Tool,
    handler: F,
}

impl<F> ToolHandler for FnTool<F>
where
    F: Fn(Map<String, Value>) -> Result<Value, ToolError> + Send + Sync,
{
    fn descriptor(&self) -> Tool {
        self.descriptor.clone()
    }

    fn call(&self, input: Map<String, Value>) -> Result<Value, ToolError> {
        (self.handler)(input)
    }
}

struct Entry {
    descriptor: Tool,
    handler: Arc<dyn ToolHandler>,
}

/// Registered tools, in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<Entry>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names are unique within a registry.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) -> Result<(), RegistryError> {
        let descriptor = handler.descriptor();
        if self.by_name.contains_key(&descriptor.name) {
            return Err(RegistryError::Duplicate(descriptor.name));
        }

        self.by_name
            .insert(descriptor.name.clone(), self.entries.len());
        self.entries.push(Entry {
            descriptor,
            handler,
        });
        Ok(())
    }

    /// Register a closure as a tool.
    pub fn register_fn<F>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(Map<String, Value>) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        let descriptor = Tool {
            name: name.into(),
            description: description.into(),
            input_schema,
        };
        self.register(Arc::new(FnTool {
            descriptor,
            handler,
        }))
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.by_name
            .get(name)
            .map(|&index| &self.entries[index].handler)
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Descriptors of every tool, in registration order.
    pub fn descriptors(&self) -> Vec<Tool> {
        self.entries.iter().map(|e| e.descriptor.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Schema for a tool that takes no input.
pub fn empty_object_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

/// Object schema with the given properties and required keys.
pub fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}
