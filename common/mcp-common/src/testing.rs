//! Test-only provider shared by the protocol and transport tests

use std::sync::Arc;

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Content, JsonObject, Tool};
use serde_json::{json, Value};

use crate::error::{method_not_found, McpResult};
use crate::provider::ToolProvider;

/// Echoes its arguments back; the only tool is `echo`
pub struct EchoServer;

#[async_trait]
impl ToolProvider for EchoServer {
    fn server_name(&self) -> &str {
        "echo"
    }

    fn server_version(&self) -> &str {
        "1.2.3"
    }

    fn list_tools(&self) -> Vec<Tool> {
        let schema = match json!({"type": "object"}) {
            Value::Object(map) => map,
            _ => JsonObject::new(),
        };
        vec![Tool::new("echo", "Echo the arguments", Arc::new(schema))]
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<CallToolResult> {
        match name {
            "echo" => Ok(CallToolResult::success(vec![Content::text(
                arguments.to_string(),
            )])),
            other => Err(method_not_found(other)),
        }
    }
}
