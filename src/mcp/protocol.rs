//! MCP JSON-RPC protocol implementation

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::error::{BridgeError, Result};
use crate::types::ClientInfo;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC error codes
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// Standard MCP methods
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const LIST_TOOLS: &str = "tools/list";
    pub const CALL_TOOL: &str = "tools/call";
    pub const PING: &str = "ping";
}

/// One message on the wire
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(McpRequest),
    Notification(McpNotification),
    Response(McpResponse),
}

/// Request expecting exactly one response with the same id
#[derive(Debug, Clone, PartialEq)]
pub struct McpRequest {
    pub id: u64,
    pub method: String,
    pub params: Value,
}

/// Fire-and-forget message, never answered
#[derive(Debug, Clone, PartialEq)]
pub struct McpNotification {
    pub method: String,
    pub params: Value,
}

/// Response to the request with the same id
#[derive(Debug, Clone, PartialEq)]
pub struct McpResponse {
    pub id: u64,
    pub outcome: std::result::Result<Value, McpError>,
}

/// MCP error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl McpRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }
}

impl McpNotification {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: Value::Null,
        }
    }
}

impl McpResponse {
    /// Create a success response
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            id,
            outcome: Ok(result),
        }
    }

    /// Create an error response
    pub fn error(id: u64, code: i64, message: impl Into<String>) -> Self {
        Self {
            id,
            outcome: Err(McpError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Create error from BridgeError
    pub fn from_error(id: u64, err: BridgeError) -> Self {
        Self::error(id, err.code(), err.to_string())
    }

    pub fn into_result(self) -> Result<Value> {
        self.outcome.map_err(|e| BridgeError::Rpc {
            code: e.code,
            message: e.message,
        })
    }
}

impl From<McpRequest> for Message {
    fn from(request: McpRequest) -> Self {
        Message::Request(request)
    }
}

impl From<McpNotification> for Message {
    fn from(notification: McpNotification) -> Self {
        Message::Notification(notification)
    }
}

impl From<McpResponse> for Message {
    fn from(response: McpResponse) -> Self {
        Message::Response(response)
    }
}

impl Message {
    /// Encode as a JSON-RPC 2.0 object
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("jsonrpc".into(), json!(JSONRPC_VERSION));
        match self {
            Message::Request(req) => {
                obj.insert("id".into(), json!(req.id));
                obj.insert("method".into(), json!(req.method));
                if !req.params.is_null() {
                    obj.insert("params".into(), req.params.clone());
                }
            }
            Message::Notification(note) => {
                obj.insert("method".into(), json!(note.method));
                if !note.params.is_null() {
                    obj.insert("params".into(), note.params.clone());
                }
            }
            Message::Response(resp) => {
                obj.insert("id".into(), json!(resp.id));
                match &resp.outcome {
                    Ok(result) => obj.insert("result".into(), result.clone()),
                    Err(error) => obj.insert("error".into(), json!(error)),
                };
            }
        }
        Value::Object(obj)
    }

    /// Decode a JSON value; the request/notification split is decided here
    /// and nowhere else.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut obj) = value else {
            return Err(BridgeError::Protocol("message is not a JSON object".into()));
        };

        match obj.get("jsonrpc").and_then(Value::as_str) {
            Some(JSONRPC_VERSION) => {}
            other => {
                return Err(BridgeError::Protocol(format!(
                    "unsupported jsonrpc version: {:?}",
                    other
                )))
            }
        }

        let id = match obj.remove("id") {
            None | Some(Value::Null) => None,
            Some(raw) => Some(raw.as_u64().ok_or_else(|| {
                BridgeError::Protocol(format!("id must be a positive integer, got {}", raw))
            })?),
        };
        let params = obj.remove("params").unwrap_or(Value::Null);

        if let Some(method) = obj.remove("method") {
            let method = match method {
                Value::String(m) => m,
                other => {
                    return Err(BridgeError::Protocol(format!(
                        "method must be a string, got {}",
                        other
                    )))
                }
            };
            return Ok(match id {
                Some(id) => Message::Request(McpRequest { id, method, params }),
                None => Message::Notification(McpNotification { method, params }),
            });
        }

        let id = id.ok_or_else(|| BridgeError::Protocol("response without id".into()))?;
        if let Some(error) = obj.remove("error") {
            let error: McpError = serde_json::from_value(error)
                .map_err(|e| BridgeError::Protocol(format!("malformed error object: {}", e)))?;
            return Ok(Message::Response(McpResponse {
                id,
                outcome: Err(error),
            }));
        }
        match obj.remove("result") {
            Some(result) => Ok(Message::Response(McpResponse::success(id, result))),
            None => Err(BridgeError::Protocol(format!(
                "response {} has neither result nor error",
                id
            ))),
        }
    }

    /// Best-effort id recovery from a message that failed to decode
    pub fn salvage_id(value: &Value) -> Option<u64> {
        value.get("id").and_then(Value::as_u64)
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Message::from_value(value).map_err(serde::de::Error::custom)
    }
}

/// Trait for handling MCP requests on the worker side
pub trait McpHandler: Send + Sync {
    fn handle_request(&self, request: McpRequest) -> McpResponse;

    fn handle_notification(&self, notification: McpNotification) {
        tracing::debug!("Ignoring notification {}", notification.method);
    }
}

/// MCP tool definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Parameters of the `initialize` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeParams {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: Value,
    #[serde(rename = "clientInfo")]
    pub client_info: ClientInfo,
}

impl InitializeParams {
    pub fn new(client_info: ClientInfo) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: json!({}),
            client_info,
        }
    }
}

/// MCP initialize result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// Server capabilities
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsCapability {
    #[serde(rename = "listChanged", default)]
    pub list_changed: bool,
}

/// Server info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl Default for InitializeResult {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: ServerInfo {
                name: "chinook-bridge".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }
}

/// Tool call result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

impl ToolCallResult {
    /// Create a text result
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: None,
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: Some(true),
        }
    }

    /// Text of the first content item
    pub fn first_text(&self) -> Option<&str> {
        self.content
            .iter()
            .map(|c| match c {
                ToolContent::Text { text } => text.as_str(),
            })
            .next()
    }
}
