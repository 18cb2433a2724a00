//! Session request dispatch.
//!
//! A [`Session`] owns everything one engine lifetime needs: the discovery
//! caches and the tool surface chosen at startup. Nothing here is global, so
//! independent sessions never share state.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use billbridge_core::Config;
use billbridge_source::Discovery;
use billbridge_tools::{Surface, SurfaceBuilder, SurfaceMode, ToolError};

use crate::protocol::{
    methods, parse_request, CallToolParams, CallToolResult, Incoming, InitializeResult,
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResult, ServerCapabilities,
    RequestId, ServerInfo, ToolsCapability, MCP_PROTOCOL_VERSION,
};

/// One engine lifetime: a fixed tool surface plus request dispatch.
pub struct Session {
    discovery: Arc<Discovery>,
    surface: Surface,
    server_name: String,
    invocation_timeout: Option<Duration>,
}

impl Session {
    /// Probe the source and build the session's surface.
    ///
    /// Never fails: an unreachable source yields the fallback surface.
    pub async fn start(discovery: Arc<Discovery>, config: &Config) -> Self {
        let surface = SurfaceBuilder::new(Arc::clone(&discovery), config)
            .build()
            .await;
        Self::with_surface(discovery, surface, config)
    }

    /// Create a session around an already built surface.
    pub fn with_surface(discovery: Arc<Discovery>, surface: Surface, config: &Config) -> Self {
        Self {
            discovery,
            surface,
            server_name: config.server.name.clone(),
            invocation_timeout: config.server.invocation_timeout_secs.map(Duration::from_secs),
        }
    }

    /// The surface selected at startup.
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// The session's discovery caches.
    pub fn discovery(&self) -> &Arc<Discovery> {
        &self.discovery
    }

    /// Handle one raw input line; returns the serialized response, if any.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        match parse_request(line) {
            Incoming::Request(request) => encode(self.handle_request(request).await?),
            Incoming::Invalid(id, error) => self.reject(id, error),
        }
    }

    /// Answer a line that could not be read as text.
    pub fn reject_undecodable(&self, detail: impl std::fmt::Display) -> Option<String> {
        self.reject(None, JsonRpcError::parse_error(detail))
    }

    fn reject(&self, id: Option<RequestId>, error: JsonRpcError) -> Option<String> {
        warn!(code = error.code, message = %error.message, "Rejected malformed request");
        encode(JsonRpcResponse::failure(id, error))
    }

    /// Dispatch a parsed request. Notifications produce no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            debug!(method = %request.method, "Received notification");
            return None;
        }

        let id = request.id.clone();
        debug!(method = %request.method, id = ?id, "Handling request");

        let result = match request.method.as_str() {
            methods::INITIALIZE => self.initialize(),
            methods::PING => Ok(json!({})),
            methods::TOOLS_LIST => self.list_tools(),
            methods::TOOLS_CALL => self.call_tool(request.params).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    fn initialize(&self) -> Result<Value, JsonRpcError> {
        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: ServerInfo {
                name: self.server_name.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(self.instructions()),
        };
        info!(mode = %self.surface.mode, "Client initialized");
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal(e.to_string()))
    }

    fn instructions(&self) -> String {
        match self.surface.mode {
            SurfaceMode::Direct => format!(
                "Each of the {} billing API methods is available as its own tool.",
                self.surface.method_count()
            ),
            SurfaceMode::Meta => format!(
                "The billing API exposes {} methods. Use list_methods to find one, \
                 get_method_details to read its parameters and call_api to invoke it.",
                self.surface.method_count()
            ),
            SurfaceMode::Fallback => {
                let reason = self
                    .surface
                    .fallback_reason
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                format!(
                    "The billing API is unavailable ({}). Use test_connection to check \
                     connectivity and restart the server once it works.",
                    reason
                )
            }
        }
    }

    fn list_tools(&self) -> Result<Value, JsonRpcError> {
        let result = ListToolsResult {
            tools: self.surface.registry.definitions(),
        };
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal(e.to_string()))
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params = params.ok_or_else(|| JsonRpcError::invalid_params("tools/call requires params"))?;
        let params: CallToolParams = serde_json::from_value(params)
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid tools/call params: {}", e)))?;

        let arguments = params.arguments.unwrap_or(Value::Null);
        let result = match self.invocation_timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, self.surface.registry.execute(&params.name, arguments))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(ToolError::Timeout(limit.as_secs())),
                }
            }
            None => self.surface.registry.execute(&params.name, arguments).await,
        };

        match result {
            Ok(value) => serde_json::to_value(CallToolResult::json(&value))
                .map_err(|e| JsonRpcError::internal(e.to_string())),
            Err(e) => {
                warn!(tool = %params.name, error = %e, "Tool call failed");
                Err(JsonRpcError::from(&e))
            }
        }
    }
}

fn encode(response: JsonRpcResponse) -> Option<String> {
    match serde_json::to_string(&response) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!(error = %e, "Failed to serialize response");
            let fallback = JsonRpcResponse::failure(
                response.id,
                JsonRpcError::internal("Failed to serialize response"),
            );
            serde_json::to_string(&fallback).ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billbridge_source::CatalogSource;

    async fn session(source: CatalogSource) -> Session {
        let config = Config::default();
        let discovery = Arc::new(Discovery::from_config(Arc::new(source), &config.discovery));
        Session::start(discovery, &config).await
    }

    async fn call(session: &Session, line: &str) -> Value {
        let response = session.handle_line(line).await.expect("response");
        serde_json::from_str(&response).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_and_ping() {
        let session = session(CatalogSource::with_methods(["GetClients"])).await;

        let init = call(&session, r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#).await;
        assert_eq!(init["id"], 1);
        assert_eq!(init["result"]["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(init["result"]["serverInfo"]["name"], "billbridge");
        assert_eq!(init["result"]["capabilities"]["tools"]["listChanged"], false);

        let ping = call(&session, r#"{"jsonrpc":"2.0","id":"p","method":"ping"}"#).await;
        assert_eq!(ping["id"], "p");
        assert_eq!(ping["result"], json!({}));
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let session = session(CatalogSource::with_methods(["GetClients"])).await;
        let response = session
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_unknown_method_and_tool() {
        let session = session(CatalogSource::with_methods(["GetClients"])).await;

        let unknown = call(&session, r#"{"jsonrpc":"2.0","id":2,"method":"resources/list"}"#).await;
        assert_eq!(unknown["error"]["code"], JsonRpcError::METHOD_NOT_FOUND);

        let no_tool = call(
            &session,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"nope"}}"#,
        )
        .await;
        assert_eq!(no_tool["id"], 3);
        assert_eq!(no_tool["error"]["code"], JsonRpcError::TOOL_NOT_FOUND);
        assert_eq!(no_tool["error"]["message"], "Tool not found: nope");
    }

    #[tokio::test]
    async fn test_tools_call_wraps_result() {
        let session = session(
            CatalogSource::with_methods(["GetClients"])
                .with_response("GetClients", json!({"result": "success", "totalresults": 3})),
        )
        .await;

        let response = call(
            &session,
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"billing_getclients","arguments":{}}}"#,
        )
        .await;
        assert_eq!(response["result"]["isError"], false);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        let payload: Value = serde_json::from_str(text).unwrap();
        assert_eq!(payload["totalresults"], 3);
    }

    #[tokio::test]
    async fn test_tools_call_invalid_params() {
        let session = session(CatalogSource::with_methods(["GetClients"])).await;

        let missing = call(&session, r#"{"jsonrpc":"2.0","id":5,"method":"tools/call"}"#).await;
        assert_eq!(missing["error"]["code"], JsonRpcError::INVALID_PARAMS);

        let bad_args = call(
            &session,
            r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"billing_getclients","arguments":"x"}}"#,
        )
        .await;
        assert_eq!(bad_args["error"]["code"], JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invocation_timeout() {
        use async_trait::async_trait;
        use billbridge_core::ToolDefinition;
        use billbridge_tools::{Tool, ToolRegistry};

        struct Stalled;

        #[async_trait]
        impl Tool for Stalled {
            fn name(&self) -> &str {
                "stalled"
            }

            fn definition(&self) -> ToolDefinition {
                ToolDefinition::new("stalled", "Never finishes")
            }

            async fn execute(&self, _arguments: Value) -> Result<Value, ToolError> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Value::Null)
            }
        }

        let mut config = Config::default();
        config.server.invocation_timeout_secs = Some(5);
        let discovery = Arc::new(Discovery::from_config(
            Arc::new(CatalogSource::new()),
            &config.discovery,
        ));
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Stalled));
        let surface = Surface {
            mode: SurfaceMode::Direct,
            registry,
            methods: Arc::new(vec!["Stalled".to_string()]),
            fallback_reason: None,
        };
        let session = Session::with_surface(discovery, surface, &config);

        let response = call(
            &session,
            r#"{"jsonrpc":"2.0","id":9,"method":"tools/call","params":{"name":"stalled"}}"#,
        )
        .await;
        assert_eq!(response["error"]["code"], JsonRpcError::INVOCATION_FAILED);
        assert!(response["error"]["message"]
            .as_str()
            .unwrap()
            .contains("timed out after 5 seconds"));
    }
}
