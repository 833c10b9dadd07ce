//! Tool result shape returned to MCP callers.
//!
//! Every ERP tool answers with a JSON list. On failure the list holds exactly
//! one `{"error": "..."}` element; callers look for that key instead of a
//! status field.

use serde_json::{json, Value as JsonValue};

use crate::core::error::ErpError;

pub type ToolResult = Vec<JsonValue>;

pub fn error_result(message: impl Into<String>) -> ToolResult {
    vec![json!({ "error": message.into() })]
}

/// Collapse an adapter result into the uniform list shape.
pub fn collapse(res: Result<Vec<JsonValue>, ErpError>) -> ToolResult {
    match res {
        Ok(records) => records,
        Err(e) => error_result(e.to_string()),
    }
}

pub fn is_error(result: &[JsonValue]) -> bool {
    matches!(result, [only] if only.get("error").is_some())
}
