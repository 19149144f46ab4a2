//! Tool provider trait
//!
//! [`ToolProvider`] is what an MCP server implements to be served by
//! [`McpHandler`](crate::McpHandler): identity for the handshake, a fixed
//! tool listing, and tool invocation by name.

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Tool};
use serde_json::Value;

use crate::error::McpResult;

/// A server that exposes named tools over MCP
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` because the HTTP transport shares
/// one provider across concurrent connections.
///
/// # Errors
///
/// `call_tool` returns `Err` only for protocol-level failures: an unknown
/// tool name (`-32601`) or an internal failure (`-32603`). Failures the model
/// should see are returned as `Ok` results with `isError: true`.
#[async_trait]
pub trait ToolProvider: Send + Sync + 'static {
    /// Server name reported in the `initialize` handshake
    fn server_name(&self) -> &str;

    /// Server version reported in the `initialize` handshake
    fn server_version(&self) -> &str;

    /// Optional usage instructions for the client
    fn instructions(&self) -> Option<&str> {
        None
    }

    /// Returns all available tools with their input schemas
    fn list_tools(&self) -> Vec<Tool>;

    /// Executes a tool by name with the given JSON arguments
    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<CallToolResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::method_not_found;

    // Minimal test implementation
    struct TestServer;

    #[async_trait]
    impl ToolProvider for TestServer {
        fn server_name(&self) -> &str {
            "test-server"
        }

        fn server_version(&self) -> &str {
            "0.0.1"
        }

        fn list_tools(&self) -> Vec<Tool> {
            vec![]
        }

        async fn call_tool(&self, name: &str, _arguments: Value) -> McpResult<CallToolResult> {
            Err(method_not_found(name))
        }
    }

    #[test]
    fn test_defaults() {
        let server = TestServer;
        assert_eq!(server.server_name(), "test-server");
        assert!(server.instructions().is_none());
        assert!(server.list_tools().is_empty());
    }

    #[tokio::test]
    async fn test_call_unknown_tool() {
        let server = TestServer;
        let result = server.call_tool("unknown", serde_json::json!({})).await;
        assert_eq!(result.unwrap_err().code.0, -32601);
    }
}
