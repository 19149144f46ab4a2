//! JSON-RPC envelope and MCP method routing
//!
//! [`McpHandler`] knows nothing about transports. A transport decodes one
//! message, passes it to [`McpHandler::handle_value`] and writes back the
//! returned response, if any. Notifications (no `id`) never produce one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rmcp::model::{
    Implementation, InitializeResult, JsonRpcVersion2_0, ProtocolVersion, ServerCapabilities,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{
    invalid_params, invalid_request, method_not_found, McpError, McpResult, ResultExt,
};
use crate::provider::ToolProvider;

/// An incoming JSON-RPC message (request or notification)
///
/// An `id` that is absent or `null` marks a notification.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonRpcMessage {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcMessage {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// An outgoing JSON-RPC response: exactly one of `result` / `error` is set
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: JsonRpcVersion2_0,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JsonRpcVersion2_0,
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: McpError) -> Self {
        Self {
            jsonrpc: JsonRpcVersion2_0,
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

/// Handshake state of a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No `initialize` received yet; only `initialize` and `ping` are served
    Uninitialized,
    /// Handshake done; tool listing and invocation are available
    Ready,
}

/// Transport-agnostic MCP request router
///
/// One handler is shared by all connections of a transport, so the
/// handshake state is stored atomically.
pub struct McpHandler<P> {
    provider: Arc<P>,
    ready: AtomicBool,
}

impl<P: ToolProvider> McpHandler<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(provider),
            ready: AtomicBool::new(false),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn state(&self) -> SessionState {
        if self.ready.load(Ordering::Acquire) {
            SessionState::Ready
        } else {
            SessionState::Uninitialized
        }
    }

    /// Handle a decoded JSON value that should be a JSON-RPC message
    ///
    /// Values that do not have the envelope shape get an invalid-request
    /// error if an `id` can be recovered, and are dropped otherwise.
    pub async fn handle_value(&self, raw: Value) -> Option<JsonRpcResponse> {
        let id = raw.get("id").filter(|id| !id.is_null()).cloned();
        match serde_json::from_value::<JsonRpcMessage>(raw) {
            Ok(message) => self.handle_message(message).await,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed JSON-RPC message");
                id.map(|id| JsonRpcResponse::failure(id, invalid_request(e.to_string())))
            }
        }
    }

    /// Handle one JSON-RPC message
    ///
    /// Returns `None` for notifications and `Some` for every request.
    pub async fn handle_message(&self, message: JsonRpcMessage) -> Option<JsonRpcResponse> {
        let Some(id) = message.id else {
            tracing::debug!(
                method = message.method.as_deref().unwrap_or_default(),
                "Notification received"
            );
            return None;
        };

        let outcome = match message.method.as_deref() {
            Some(method) => {
                tracing::debug!(%method, %id, "Request received");
                self.dispatch(method, message.params).await
            }
            None => Err(invalid_request("Request is missing a method")),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> McpResult<Value> {
        match method {
            "initialize" => self.initialize(params.as_ref()),
            "ping" => Ok(json!({})),
            "tools/list" => {
                self.require_ready(method)?;
                Ok(json!({ "tools": self.provider.list_tools() }))
            }
            "tools/call" => {
                self.require_ready(method)?;
                self.call_tool(params).await
            }
            other => Err(method_not_found(other)),
        }
    }

    fn initialize(&self, params: Option<&Value>) -> McpResult<Value> {
        let client = params
            .and_then(|p| p.pointer("/clientInfo/name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");

        if !self.ready.swap(true, Ordering::AcqRel) {
            tracing::info!(%client, "Client initialized");
        }

        let result = InitializeResult {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.provider.server_name().to_string(),
                version: self.provider.server_version().to_string(),
                ..Default::default()
            },
            instructions: self.provider.instructions().map(str::to_string),
        };
        serde_json::to_value(result).to_mcp_err()
    }

    fn require_ready(&self, method: &str) -> McpResult<()> {
        match self.state() {
            SessionState::Ready => Ok(()),
            SessionState::Uninitialized => Err(invalid_request(format!(
                "Server not initialized: send initialize before {}",
                method
            ))),
        }
    }

    async fn call_tool(&self, params: Option<Value>) -> McpResult<Value> {
        let params: CallToolParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|e| invalid_params(format!("Invalid tools/call params: {}", e)))?;
        let arguments = match params.arguments {
            Some(Value::Null) | None => json!({}),
            Some(arguments) => arguments,
        };

        let result = self.provider.call_tool(&params.name, arguments).await?;
        serde_json::to_value(result).to_mcp_err()
    }
}
