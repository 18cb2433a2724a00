//! Capability source trait definitions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SourceError;

/// Metadata describing one discovered method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodDetails {
    /// Human-readable description, if the source provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared parameters, in source order
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
}

impl MethodDetails {
    /// Details used when the source could not describe a method.
    pub fn generic() -> Self {
        Self::default()
    }

    /// Description if present and non-blank.
    pub fn description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    /// Whether any parameter metadata exists.
    pub fn has_parameters(&self) -> bool {
        !self.parameters.is_empty()
    }
}

/// A single declared parameter of a method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Parameter name
    pub name: String,
    /// JSON Schema type name (string, integer, number, boolean, array, object)
    #[serde(rename = "type", default = "default_param_type")]
    pub param_type: String,
    /// Parameter description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the source marks the parameter as required
    #[serde(default)]
    pub required: bool,
}

fn default_param_type() -> String {
    "string".to_string()
}

impl ParameterSpec {
    /// Create an optional string parameter.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: default_param_type(),
            description: None,
            required: false,
        }
    }

    /// Set the type.
    pub fn with_type(mut self, param_type: impl Into<String>) -> Self {
        self.param_type = param_type.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// An opaque API that can report and execute its own operations.
///
/// Implementations own their transport and credentials; callers only see
/// method names, method metadata and opaque JSON results.
#[async_trait]
pub trait CapabilitySource: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Check that the API is reachable and accepts the credentials.
    ///
    /// Never fails: any transport or auth failure yields `false`.
    async fn test_connection(&self) -> bool;

    /// List the methods available to the current credentials.
    async fn list_methods(&self) -> Result<Vec<String>, SourceError>;

    /// Fetch metadata for one method.
    async fn get_method_details(&self, method: &str) -> Result<MethodDetails, SourceError>;

    /// Execute a method with JSON arguments.
    async fn invoke(&self, method: &str, args: Value) -> Result<Value, SourceError>;
}
