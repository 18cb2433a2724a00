//! MCP protocol types.
//!
//! JSON-RPC 2.0 envelopes and the subset of MCP structures the engine
//! produces. Requests are parsed leniently (see [`parse_request`]) so that
//! every malformed line still yields exactly one error response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use billbridge_core::ToolDefinition;
use billbridge_tools::ToolError;

/// JSON-RPC protocol version.
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol version.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Protocol methods handled by the engine.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const PING: &str = "ping";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
    /// Prefix of client notifications, which never get a response.
    pub const NOTIFICATION_PREFIX: &str = "notifications/";
}

/// Request ID for JSON-RPC messages.
///
/// An explicit `"id": null` is a request like any other and is answered
/// with `id: null`; only an absent id marks a notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric ID, kept exactly as sent.
    Number(serde_json::Number),
    /// String ID.
    String(String),
    /// Explicit null ID.
    Null,
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        Self::Number(id.into())
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::String(id.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => write!(f, "{}", s),
            Self::Null => write!(f, "null"),
        }
    }
}

/// JSON-RPC request message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version. Accepted when absent.
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    /// Request ID; absent for notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    /// Method name.
    pub method: String,
    /// Optional method parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

fn default_version() -> String {
    JSONRPC_VERSION.to_string()
}

impl JsonRpcRequest {
    /// Whether this message is a client notification.
    pub fn is_notification(&self) -> bool {
        self.id.is_none() && self.method.starts_with(methods::NOTIFICATION_PREFIX)
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i32,
    /// Error message.
    pub message: String,
    /// Optional additional data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Standard JSON-RPC error codes.
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    /// Server-defined codes.
    pub const INVOCATION_FAILED: i32 = -32000;
    pub const TOOL_NOT_FOUND: i32 = -32001;
    pub const METHOD_NOT_PERMITTED: i32 = -32002;

    /// Create an error object.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error(detail: impl std::fmt::Display) -> Self {
        Self::new(Self::PARSE_ERROR, format!("Parse error: {}", detail))
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_REQUEST, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(Self::METHOD_NOT_FOUND, format!("Method not found: {}", method))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_PARAMS, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Self::INTERNAL_ERROR, message)
    }
}

impl From<&ToolError> for JsonRpcError {
    fn from(e: &ToolError) -> Self {
        let code = match e {
            ToolError::NotFound(_) => Self::TOOL_NOT_FOUND,
            ToolError::NotPermitted(_) => Self::METHOD_NOT_PERMITTED,
            ToolError::MissingParameter(_) | ToolError::InvalidArguments(_) => Self::INVALID_PARAMS,
            ToolError::Invocation(_) | ToolError::Timeout(_) => Self::INVOCATION_FAILED,
        };
        Self::new(code, e.to_string())
    }
}

/// JSON-RPC response message.
///
/// `id` is serialized as `null` when the request id could not be read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,
    /// Request ID this is responding to.
    pub id: Option<RequestId>,
    /// Successful result (mutually exclusive with error).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error object (mutually exclusive with result).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn failure(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// Outcome of reading one line of input.
#[derive(Debug)]
pub enum Incoming {
    /// A well-formed request or notification.
    Request(JsonRpcRequest),
    /// A line that cannot be dispatched; answer with this error.
    Invalid(Option<RequestId>, JsonRpcError),
}

/// Parse one line into a request.
///
/// The id is recovered whenever the line is valid JSON with a usable `id`,
/// even if the rest of the envelope is malformed.
pub fn parse_request(line: &str) -> Incoming {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => return Incoming::Invalid(None, JsonRpcError::parse_error(e)),
    };

    let Some(object) = value.as_object() else {
        return Incoming::Invalid(None, JsonRpcError::invalid_request("Request must be a JSON object"));
    };

    let id = match object.get("id") {
        None => None,
        Some(raw) => match serde_json::from_value::<RequestId>(raw.clone()) {
            Ok(id) => Some(id),
            Err(_) => {
                return Incoming::Invalid(
                    None,
                    JsonRpcError::invalid_request("id must be a string, a number or null"),
                )
            }
        },
    };

    if let Some(version) = object.get("jsonrpc") {
        if version.as_str() != Some(JSONRPC_VERSION) {
            return Incoming::Invalid(id, JsonRpcError::invalid_request("jsonrpc must be '2.0'"));
        }
    }

    match serde_json::from_value::<JsonRpcRequest>(value) {
        Ok(mut request) => {
            // serde reads `"id": null` as an absent id
            request.id = id;
            if request.id.is_none() && !request.is_notification() {
                return Incoming::Invalid(
                    None,
                    JsonRpcError::invalid_request(format!("Request '{}' is missing an id", request.method)),
                );
            }
            Incoming::Request(request)
        }
        Err(e) => Incoming::Invalid(id, JsonRpcError::invalid_request(format!("Invalid request: {}", e))),
    }
}

// ============================================================================
// MCP Protocol Types
// ============================================================================

/// Server information returned during initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

/// Server capabilities returned during initialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Tools capability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

/// Tools capability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    /// Whether the server announces tool list changes. Always false: the
    /// surface is fixed for the session.
    #[serde(default)]
    pub list_changed: bool,
}

/// Result of the initialize request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// MCP protocol version.
    pub protocol_version: String,
    /// Server capabilities.
    pub capabilities: ServerCapabilities,
    /// Server information.
    pub server_info: ServerInfo,
    /// Usage hints for the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Result of the tools/list request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListToolsResult {
    /// Every registered tool.
    pub tools: Vec<ToolDefinition>,
}

/// Parameters for the tools/call request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    /// Tool name.
    pub name: String,
    /// Tool arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

/// Result of the tools/call request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the tool execution resulted in an error.
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Wrap a tool's JSON output as pretty-printed text content.
    pub fn json(value: &Value) -> Self {
        let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        Self {
            content: vec![ToolContent::text(text)],
            is_error: false,
        }
    }
}

/// Content returned by a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

impl ToolContent {
    /// Create a text content item.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Get the text content.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
        }
    }
}
