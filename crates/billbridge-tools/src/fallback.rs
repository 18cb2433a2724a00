//! Fallback-mode tools.
//!
//! Registered when the source is unreachable or discovery fails. Neither
//! tool ever fails: problems are reported inside the result payload.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

use billbridge_core::ToolDefinition;
use billbridge_source::Discovery;

use crate::registry::Tool;
use crate::surface::FallbackReason;
use crate::ToolError;

/// Name of the connectivity probe tool.
pub const TEST_CONNECTION: &str = "test_connection";
/// Name of the server information tool.
pub const SERVER_INFO: &str = "server_info";

/// Re-probe the source.
pub struct TestConnectionTool {
    discovery: Arc<Discovery>,
}

impl TestConnectionTool {
    pub fn new(discovery: Arc<Discovery>) -> Self {
        Self { discovery }
    }
}

#[async_trait]
impl Tool for TestConnectionTool {
    fn name(&self) -> &str {
        TEST_CONNECTION
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            TEST_CONNECTION,
            "Test the connection to the billing API. A restart is required to \
             expose its methods once the connection works.",
        )
    }

    async fn execute(&self, _arguments: Value) -> Result<Value, ToolError> {
        let connected = self.discovery.test_connection().await;
        let message = if connected {
            "Connection successful"
        } else {
            "Connection failed. Check the API URL and credentials."
        };
        Ok(json!({
            "connected": connected,
            "source": self.discovery.source().name(),
            "message": message,
        }))
    }
}

/// Report server status and whatever the source says about itself.
pub struct ServerInfoTool {
    discovery: Arc<Discovery>,
    info_method: String,
    server_name: String,
    reason: FallbackReason,
}

impl ServerInfoTool {
    /// Create a tool reporting through `info_method`.
    pub fn new(
        discovery: Arc<Discovery>,
        info_method: impl Into<String>,
        server_name: impl Into<String>,
        reason: FallbackReason,
    ) -> Self {
        Self {
            discovery,
            info_method: info_method.into(),
            server_name: server_name.into(),
            reason,
        }
    }
}

#[async_trait]
impl Tool for ServerInfoTool {
    fn name(&self) -> &str {
        SERVER_INFO
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            SERVER_INFO,
            "Get server status and information reported by the billing API.",
        )
    }

    async fn execute(&self, _arguments: Value) -> Result<Value, ToolError> {
        let mut info = json!({
            "server": self.server_name,
            "version": env!("CARGO_PKG_VERSION"),
            "mode": "fallback",
            "reason": self.reason.to_string(),
            "checked_at": Utc::now().to_rfc3339(),
        });

        match self.discovery.invoke(&self.info_method, json!({})).await {
            Ok(status) => info["status"] = status,
            Err(e) => {
                warn!(method = %self.info_method, error = %e, "Server info unavailable");
                info["error"] = Value::String(e.to_string());
            }
        }
        Ok(info)
    }
}
