//! MCP JSON-RPC 2.0 protocol handling
//!
//! [`McpHandler`] is transport-agnostic: stdio, HTTP and WebSocket all feed
//! it raw messages and write back whatever it returns. Notifications produce
//! no response.
//!
//! # Supported methods
//!
//! | Method                      | Result                                   |
//! |-----------------------------|------------------------------------------|
//! | `initialize`                | protocol version, capabilities, server info |
//! | `notifications/initialized` | none (notification)                      |
//! | `ping`                      | `{}`                                     |
//! | `tools/list`                | `{ tools: [...] }`                       |
//! | `tools/call`                | `{ content: [{type, text}], isError }`   |
//!
//! A `tools/call` carrying `_meta.progressToken` streams its progress as
//! `notifications/progress` over the connection's notifier.

use crate::progress::NotificationProgress;
use mcp_integration_core::progress::{ProgressReporter, TracingProgress};
use mcp_integration_tools::ToolRegistry;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Protocol revision announced when the client requests none we support
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Protocol revisions `initialize` accepts from a client
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18"];

/// Server name reported by `initialize`
pub const SERVER_NAME: &str = "mcp-integration";

/// Invalid JSON
pub const PARSE_ERROR: i64 = -32700;
/// Not a valid request object
pub const INVALID_REQUEST: i64 = -32600;
/// Unknown method
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Bad method parameters
pub const INVALID_PARAMS: i64 = -32602;

/// Incoming JSON-RPC request or notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Must be `"2.0"`
    pub jsonrpc: String,
    /// Absent for notifications; [`McpHandler::handle_message`] keeps an
    /// explicit `null` as `Some(Value::Null)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Method name
    pub method: String,
    /// Method parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code
    pub code: i64,
    /// Human-readable message
    pub message: String,
}

/// Outgoing JSON-RPC response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`
    pub jsonrpc: String,
    /// Request id (`null` if the request could not be read)
    pub id: Value,
    /// Success payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Successful response
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Error response
    #[must_use]
    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Server-initiated notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// Always `"2.0"`
    pub jsonrpc: String,
    /// Notification method
    pub method: String,
    /// Notification parameters
    pub params: Value,
}

impl JsonRpcNotification {
    /// Create a notification
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
        }
    }
}

/// Anything the server writes to a connection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutgoingMessage {
    /// Reply to a request
    Response(JsonRpcResponse),
    /// Server notification
    Notification(JsonRpcNotification),
}

/// Per-connection channel for server-initiated messages
pub type Notifier = mpsc::UnboundedSender<OutgoingMessage>;

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
    #[serde(default, rename = "_meta")]
    meta: Option<CallMeta>,
}

#[derive(Debug, Deserialize)]
struct CallMeta {
    #[serde(default, rename = "progressToken")]
    progress_token: Option<Value>,
}

/// Dispatches MCP requests to the tool registry
#[derive(Debug, Clone)]
pub struct McpHandler {
    registry: ToolRegistry,
}

impl McpHandler {
    /// Create a handler serving `registry`
    #[must_use]
    pub const fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// Served tools
    #[must_use]
    pub const fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle one raw message
    ///
    /// Unparseable input yields a parse error with a `null` id.
    pub async fn handle_message(&self, raw: &str, notifier: Option<&Notifier>) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Discarding unparseable message");
                return Some(JsonRpcResponse::error(Value::Null, PARSE_ERROR, format!("Parse error: {e}")));
            }
        };

        // Serde reads `"id": null` as a missing id; only a missing key makes a notification
        let id = value.get("id").cloned();
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(mut request) => {
                request.id = id;
                self.handle(request, notifier).await
            }
            Err(e) => Some(JsonRpcResponse::error(
                id.unwrap_or(Value::Null),
                INVALID_REQUEST,
                format!("Invalid request: {e}"),
            )),
        }
    }

    /// Handle one request; returns `None` for notifications
    pub async fn handle(&self, request: JsonRpcRequest, notifier: Option<&Notifier>) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, id = ?request.id, "Handling request");

        let Some(id) = request.id.clone() else {
            self.handle_notification(&request);
            return None;
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                id,
                INVALID_REQUEST,
                "Unsupported jsonrpc version",
            ));
        }

        let params = request.params.unwrap_or(Value::Null);
        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, Self::initialize(&params)),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": self.registry.get_tools() })),
            "tools/call" => match self.call_tool(params, notifier).await {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(message) => JsonRpcResponse::error(id, INVALID_PARAMS, message),
            },
            method => JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {method}")),
        };

        Some(response)
    }

    fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => info!(tools = self.registry.count(), "Client initialized"),
            method => debug!(method, "Ignoring notification"),
        }
    }

    fn initialize(params: &Value) -> Value {
        let version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .filter(|requested| SUPPORTED_PROTOCOL_VERSIONS.contains(requested))
            .unwrap_or(PROTOCOL_VERSION);

        json!({
            "protocolVersion": version,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    async fn call_tool(&self, params: Value, notifier: Option<&Notifier>) -> Result<Value, String> {
        let params: CallParams =
            serde_json::from_value(params).map_err(|e| format!("Invalid tools/call params: {e}"))?;

        if self.registry.get_tool(&params.name).is_none() {
            return Err(format!("Unknown tool: {}", params.name));
        }

        let token = params.meta.and_then(|meta| meta.progress_token);
        let progress: Arc<dyn ProgressReporter> = match (token, notifier) {
            (Some(token), Some(notifier)) => Arc::new(NotificationProgress::new(token, notifier.clone())),
            _ => Arc::new(TracingProgress),
        };

        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        info!(tool = %params.name, "Calling tool");

        let result = self
            .registry
            .execute(&params.name, arguments.to_string(), Some(progress))
            .await;

        Ok(match result {
            Ok(text) => tool_result(text, false),
            Err(e) => {
                warn!(tool = %params.name, error = %e, "Tool call failed");
                tool_result(e.message, true)
            }
        })
    }
}

fn tool_result(text: String, is_error: bool) -> Value {
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error
    })
}
