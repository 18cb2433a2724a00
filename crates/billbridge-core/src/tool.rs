//! Tool definition types.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Definition of a tool exposed to callers.
///
/// This is the advertised half of a tool: what `tools/list` returns. The
/// invocable half lives behind the `Tool` trait in `billbridge-tools`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Tool name (unique within a session)
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema for the tool's arguments
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Create a new tool definition with an empty object schema.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    /// Set the input schema.
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Names of the schema's required properties.
    pub fn required(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Whether the schema accepts properties it does not declare.
    pub fn is_open(&self) -> bool {
        self.input_schema
            .get("additionalProperties")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_serializes_camel_case() {
        let def = ToolDefinition::new("billing_getclients", "List clients");
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["name"], "billing_getclients");
        assert_eq!(json["inputSchema"]["type"], "object");
        assert!(json.get("input_schema").is_none());
    }

    #[test]
    fn test_required_and_open() {
        let def = ToolDefinition::new("call_api", "Call").with_input_schema(json!({
            "type": "object",
            "properties": {"method": {"type": "string"}},
            "required": ["method"]
        }));
        assert_eq!(def.required(), vec!["method"]);
        assert!(!def.is_open());

        let open = ToolDefinition::new("x", "y").with_input_schema(json!({
            "type": "object",
            "additionalProperties": true
        }));
        assert!(open.required().is_empty());
        assert!(open.is_open());
    }
}
