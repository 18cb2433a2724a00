//! Direct-mode tools: one tool per discovered method.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use billbridge_core::ToolDefinition;
use billbridge_source::Discovery;

use crate::registry::Tool;
use crate::ToolError;

/// Tool that forwards its arguments to a single source method.
pub struct MethodTool {
    method: String,
    definition: ToolDefinition,
    discovery: Arc<Discovery>,
}

impl MethodTool {
    /// Create a tool for `method` with a synthesized definition.
    pub fn new(method: impl Into<String>, definition: ToolDefinition, discovery: Arc<Discovery>) -> Self {
        Self {
            method: method.into(),
            definition,
            discovery,
        }
    }

    /// The source method this tool invokes.
    pub fn method(&self) -> &str {
        &self.method
    }
}

#[async_trait]
impl Tool for MethodTool {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        debug!(method = %self.method, "Invoking method");
        Ok(self.discovery.invoke(&self.method, arguments).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billbridge_source::{CatalogSource, MethodDetails};
    use serde_json::json;
    use std::time::Duration;

    use crate::ToolSynthesizer;

    fn tool_for(source: Arc<CatalogSource>, method: &str) -> MethodTool {
        let discovery = Arc::new(Discovery::new(source, Duration::from_secs(300)));
        let definition = ToolSynthesizer::new("billing").definition(method, &MethodDetails::generic());
        MethodTool::new(method, definition, discovery)
    }

    #[tokio::test]
    async fn test_execute_invokes_source_method() {
        let source = Arc::new(CatalogSource::with_methods(["GetClients"]));
        let tool = tool_for(Arc::clone(&source), "GetClients");

        assert_eq!(tool.name(), "billing_getclients");
        assert_eq!(tool.method(), "GetClients");

        let result = tool.execute(json!({"limitnum": 10})).await.unwrap();
        assert_eq!(result["action"], "GetClients");
        assert_eq!(source.invocations()[0].1, json!({"limitnum": 10}));
    }

    #[tokio::test]
    async fn test_execute_carries_source_message() {
        let source = Arc::new(
            CatalogSource::with_methods(["GetInvoice"]).with_response(
                "GetInvoice",
                json!({"result": "error", "message": "Invoice ID Not Found"}),
            ),
        );
        let tool = tool_for(source, "GetInvoice");

        let err = tool.execute(json!({"invoiceid": 7})).await.unwrap_err();
        assert_eq!(err.to_string(), "Invoice ID Not Found");
    }
}
