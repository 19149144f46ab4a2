//! MCP Common - Shared protocol plumbing for MCP servers
//!
//! This crate provides the transport-agnostic pieces every MCP server needs:
//!
//! - **Provider**: [`ToolProvider`] trait, the seam between the protocol and a server's tools
//! - **Protocol**: JSON-RPC envelope types and the [`McpHandler`] state machine
//! - **Transports**: line-oriented stdio ([`serve_stdio`]) and HTTP ([`serve_http`])
//! - **Results**: Helper functions for creating `CallToolResult` responses
//! - **Errors**: Constructors for JSON-RPC error objects
//! - **Initialization**: [`init_tracing`] for stderr logging
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mcp_common::{McpHandler, serve_stdio};
//!
//! let handler = Arc::new(McpHandler::new(MyServer::new()));
//! serve_stdio(&handler).await?;
//! ```

pub mod error;
pub mod http;
pub mod init;
pub mod protocol;
pub mod provider;
pub mod result;
pub mod stdio;

#[cfg(test)]
mod testing;

// Re-export commonly used items at crate root
pub use error::{
    internal_error, invalid_params, invalid_request, method_not_found, IntoMcpError, McpResult,
    ResultExt,
};
pub use http::{router, serve_http, HttpConfig, MCP_PATH};
pub use init::init_tracing;
pub use protocol::{JsonRpcMessage, JsonRpcResponse, McpHandler, SessionState};
pub use provider::ToolProvider;
pub use result::{json_error, json_success};
pub use stdio::{serve_lines, serve_stdio};

// Re-export rmcp types that are commonly needed
pub use rmcp::{
    model::{CallToolResult, Content, JsonObject, Tool},
    ErrorData as McpError,
};

// Re-export async_trait for implementing ToolProvider
pub use async_trait::async_trait;
