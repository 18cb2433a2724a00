//! Tool registry for the current session.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use billbridge_core::ToolDefinition;

use crate::ToolError;

/// Trait for implementing tools.
///
/// A tool is a named, schema-described unit of work. The registry owns
/// tools for the lifetime of a session; they are never mutated.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the unique name of this tool.
    fn name(&self) -> &str;

    /// Get the tool definition including the input schema.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with normalized object arguments.
    async fn execute(&self, arguments: Value) -> Result<Value, ToolError>;

    /// Validate the arguments before execution.
    ///
    /// The default checks that every required property is present.
    fn validate(&self, arguments: &Value) -> Result<(), ToolError> {
        let definition = self.definition();
        for name in definition.required() {
            match arguments.get(name) {
                None | Some(Value::Null) => return Err(ToolError::missing_param(name)),
                _ => {}
            }
        }
        Ok(())
    }
}

/// Registry of the tools advertised in a session.
///
/// Listing order is registration order.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a tool.
    ///
    /// Returns `false` and keeps the existing tool if the name is taken.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> bool {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            warn!(tool = %name, "Tool name already registered, skipping");
            return false;
        }
        self.order.push(name.clone());
        self.tools.insert(name, tool);
        true
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List all tool names in registration order.
    pub fn list(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    /// Get all tool definitions in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name.
    pub async fn execute(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        let arguments = normalize_arguments(arguments)?;
        tool.validate(&arguments)?;

        let start = Instant::now();
        let result = tool.execute(arguments).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => debug!(tool = name, duration_ms, "Tool executed"),
            Err(e) => debug!(tool = name, duration_ms, error = %e, "Tool failed"),
        }

        result
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Arguments are always an object; absent arguments become `{}`.
fn normalize_arguments(arguments: Value) -> Result<Value, ToolError> {
    match arguments {
        Value::Null => Ok(Value::Object(Map::new())),
        Value::Object(_) => Ok(arguments),
        _ => Err(ToolError::invalid_args("arguments must be an object")),
    }
}

/// Read an optional string argument.
pub(crate) fn optional_str<'a>(arguments: &'a Value, name: &str) -> Result<Option<&'a str>, ToolError> {
    match arguments.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(ToolError::invalid_args(format!("'{}' must be a string", name))),
    }
}

/// Read a required, non-empty string argument.
pub(crate) fn required_str<'a>(arguments: &'a Value, name: &str) -> Result<&'a str, ToolError> {
    match optional_str(arguments, name)? {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(ToolError::missing_param(name)),
    }
}
