//! Structured errors for tool parameter handling.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Errors raised by the tool layer before the proxy is involved.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Method name is not a valid HTTP token.
    #[error("INVALID_INPUT: invalid method {0:?}")]
    InvalidMethod(String),

    /// Tool output could not be serialized.
    #[error("INTERNAL: {0}")]
    Serialize(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let code = match &err {
            ToolError::InvalidMethod(_) => -32602,
            ToolError::Serialize(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}

/// Pretty JSON text content for a tool result.
pub fn json_text<T: serde::Serialize>(value: &T) -> Result<String, ToolError> {
    serde_json::to_string_pretty(value).map_err(|e| ToolError::Serialize(e.to_string()))
}
