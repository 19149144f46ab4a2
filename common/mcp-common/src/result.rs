//! Result helpers for MCP tool responses
//!
//! Tool payloads are rendered as a single pretty-printed JSON text block,
//! which is what MCP clients hand to the model verbatim.

use rmcp::{
    model::{CallToolResult, Content},
    ErrorData as McpError,
};
use serde::Serialize;

/// Create a successful JSON response from any serializable data
///
/// # Example
///
/// ```rust,ignore
/// use mcp_common::json_success;
///
/// fn my_tool(&self) -> Result<CallToolResult, McpError> {
///     json_success(&MyData { value: 42 })
/// }
/// ```
pub fn json_success<T: Serialize>(data: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Create a tool-level failure (`isError: true`) from any serializable data
///
/// Tool failures the model can act on (bad input, unknown ids) are reported
/// this way instead of as JSON-RPC errors, so they reach the model.
pub fn json_error<T: Serialize>(data: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::error(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestData {
        name: String,
        value: i32,
    }

    #[test]
    fn test_json_success() {
        let data = TestData {
            name: "test".to_string(),
            value: 42,
        };
        let result = json_success(&data).unwrap();
        assert!(!result.is_error.unwrap_or(false));
        assert_eq!(result.content.len(), 1);
    }

    #[test]
    fn test_json_error_sets_flag() {
        let result = json_error(&serde_json::json!({"error": "nope"})).unwrap();
        assert_eq!(result.is_error, Some(true));

        let rendered = serde_json::to_value(&result).unwrap();
        assert_eq!(rendered["isError"], true);
        let text = rendered["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("nope"));
    }
}
