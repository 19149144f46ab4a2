//! Error handling utilities for MCP servers
//!
//! Every failure that crosses the protocol boundary is an [`McpError`]
//! (JSON-RPC error object). These helpers build them with the right codes.

use rmcp::model::ErrorCode;
pub use rmcp::ErrorData as McpError;

/// Type alias for MCP tool results
pub type McpResult<T> = Result<T, McpError>;

/// Trait for converting errors into MCP-compatible errors
///
/// Implement this trait for external error types to enable the `?` operator
/// in tool implementations.
///
/// # Example
///
/// ```rust,ignore
/// use mcp_common::IntoMcpError;
/// use rmcp::ErrorData as McpError;
///
/// impl IntoMcpError for MyError {
///     fn into_mcp_error(self) -> McpError {
///         McpError::internal_error(self.to_string(), None)
///     }
/// }
/// ```
pub trait IntoMcpError {
    /// Convert this error into an MCP error
    fn into_mcp_error(self) -> McpError;
}

impl IntoMcpError for serde_json::Error {
    fn into_mcp_error(self) -> McpError {
        McpError::internal_error(format!("JSON error: {}", self), None)
    }
}

impl IntoMcpError for tokio::task::JoinError {
    fn into_mcp_error(self) -> McpError {
        McpError::internal_error(format!("Tool task failed: {}", self), None)
    }
}

/// Extension trait for Result types to convert to MCP errors
///
/// # Example
///
/// ```rust,ignore
/// use mcp_common::ResultExt;
///
/// let outcome = tokio::task::spawn_blocking(work).await.to_mcp_err()?;
/// ```
pub trait ResultExt<T> {
    /// Convert the error to an MCP error
    fn to_mcp_err(self) -> Result<T, McpError>;
}

impl<T, E: IntoMcpError> ResultExt<T> for Result<T, E> {
    fn to_mcp_err(self) -> Result<T, McpError> {
        self.map_err(|e| e.into_mcp_error())
    }
}

/// Create an internal error (`-32603`) with a message
pub fn internal_error(message: impl Into<String>) -> McpError {
    McpError::internal_error(message.into(), None)
}

/// Create an invalid params error (`-32602`) with a message
pub fn invalid_params(message: impl Into<String>) -> McpError {
    McpError::invalid_params(message.into(), None)
}

/// Create an invalid request error (`-32600`) with a message
///
/// Used for malformed envelopes and for requests that arrive before the
/// `initialize` handshake.
pub fn invalid_request(message: impl Into<String>) -> McpError {
    McpError::new(ErrorCode::INVALID_REQUEST, message.into(), None)
}

/// Create a method-not-found error (`-32601`)
///
/// Covers both unknown RPC methods and unknown tool names.
pub fn method_not_found(what: impl std::fmt::Display) -> McpError {
    McpError::new(
        ErrorCode::METHOD_NOT_FOUND,
        format!("Method not found: {}", what),
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_ext() {
        let result: Result<(), serde_json::Error> = serde_json::from_str::<()>("{");
        let err = result.to_mcp_err().unwrap_err();
        assert_eq!(err.code.0, -32603);
        assert!(err.message.contains("JSON error"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(internal_error("boom").code.0, -32603);
        assert_eq!(invalid_params("bad").code.0, -32602);
        assert_eq!(invalid_request("early").code.0, -32600);

        let err = method_not_found("tools/destroy");
        assert_eq!(err.code.0, -32601);
        assert!(err.message.contains("tools/destroy"));
    }
}
