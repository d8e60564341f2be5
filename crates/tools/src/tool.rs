//! The tool contract shared by the built-in tools, the registry and the
//! agentic loop.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use finagent_core::ErrorKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::ModelError;

/// Name, description and JSON Schema advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned id; the matching [`ToolResult`] echoes it back.
    pub id: String,
    pub name: String,
    /// Decoded arguments. `null` when the model sent malformed JSON.
    pub input: Value,
}

/// Text returned to the model for one [`ToolCall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    /// Successful output. The loop fills in the call id.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            tool_call_id: String::new(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Failure rendered for the model instead of aborting the turn.
    pub fn error(call_id: &str, message: impl Into<String>) -> Self {
        Self {
            tool_call_id: call_id.to_string(),
            content: message.into(),
            is_error: true,
        }
    }

    pub fn for_call(mut self, call_id: &str) -> Self {
        self.tool_call_id = call_id.to_string();
        self
    }
}

/// Per-run environment handed to every tool.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Relative document paths are resolved against this directory.
    pub working_directory: PathBuf,
}

impl ToolContext {
    pub fn new(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            working_directory: working_directory.into(),
        }
    }

    pub fn resolve(&self, raw: &str) -> PathBuf {
        let path = Path::new(raw);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_directory.join(path)
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not configured: {0}")]
    NotConfigured(String),
    #[error("External service error: {0}")]
    ExternalService(String),
    #[error("Resource access error: {0}")]
    ResourceAccess(String),
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

impl ToolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::InvalidInput(_) | ToolError::NotConfigured(_) => ErrorKind::InvalidArgument,
            ToolError::ExternalService(_) | ToolError::Model(_) => ErrorKind::ExternalService,
            ToolError::ResourceAccess(_) => ErrorKind::ResourceAccess,
        }
    }
}

impl From<reqwest::Error> for ToolError {
    fn from(e: reqwest::Error) -> Self {
        ToolError::ExternalService(e.to_string())
    }
}

// ── Input helpers ─────────────────────────────────────────────

/// Required, non-blank string field.
pub(crate) fn required_str<'a>(input: &'a Value, field: &str) -> Result<&'a str, ToolError> {
    optional_str(input, field)
        .ok_or_else(|| ToolError::InvalidInput(format!("missing '{}' field", field)))
}

/// Blank strings count as absent.
pub(crate) fn optional_str<'a>(input: &'a Value, field: &str) -> Option<&'a str> {
    input
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Numeric field with a default for absent or `null`. Numeric strings are
/// accepted since models often quote amounts.
pub(crate) fn number_or(input: &Value, field: &str, default: f64) -> Result<f64, ToolError> {
    match input.get(field) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| ToolError::InvalidInput(format!("'{}' is out of range", field))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| ToolError::InvalidInput(format!("'{}' must be a number", field))),
        Some(_) => Err(ToolError::InvalidInput(format!("'{}' must be a number", field))),
    }
}

/// Echoes `message`. Used to exercise the loop without network access.
#[cfg(any(test, feature = "test-utils"))]
pub struct EchoTool;

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl Tool for EchoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "echo".to_string(),
            description: "Returns the given message unchanged.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {"message": {"type": "string"}},
                "required": ["message"]
            }),
        }
    }

    async fn execute(&self, input: Value, _context: &ToolContext) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::text(required_str(&input, "message")?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_kinds() {
        assert_eq!(
            ToolError::NotConfigured("key".into()).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            ToolError::Model(ModelError("timeout".into())).kind(),
            ErrorKind::ExternalService
        );
        assert_eq!(
            ToolError::ResourceAccess("missing".into()).kind(),
            ErrorKind::ResourceAccess
        );
    }

    #[test]
    fn blank_strings_are_missing() {
        let input = json!({"query": "   "});
        assert!(matches!(
            required_str(&input, "query"),
            Err(ToolError::InvalidInput(_))
        ));
        assert!(optional_str(&input, "query").is_none());
    }

    #[test]
    fn numbers_accept_quoted_values() {
        assert_eq!(number_or(&json!({}), "amount", 1.0).unwrap(), 1.0);
        assert_eq!(number_or(&json!({"amount": null}), "amount", 1.0).unwrap(), 1.0);
        assert_eq!(number_or(&json!({"amount": 250}), "amount", 1.0).unwrap(), 250.0);
        assert_eq!(number_or(&json!({"amount": " 12.5 "}), "amount", 1.0).unwrap(), 12.5);
        assert!(number_or(&json!({"amount": "lots"}), "amount", 1.0).is_err());
        assert!(number_or(&json!({"amount": [1]}), "amount", 1.0).is_err());
    }

    #[test]
    fn context_resolves_relative_paths() {
        let ctx = ToolContext::new("/srv/docs");
        assert_eq!(ctx.resolve("loan.pdf"), PathBuf::from("/srv/docs/loan.pdf"));
        assert_eq!(ctx.resolve("/tmp/x.txt"), PathBuf::from("/tmp/x.txt"));
    }

    #[test]
    fn error_result_carries_call_id() {
        let result = ToolResult::error("call_7", "Unknown tool: fax");
        assert!(result.is_error);
        assert_eq!(result.tool_call_id, "call_7");
        assert_eq!(ToolResult::text("ok").for_call("c").tool_call_id, "c");
    }

    #[tokio::test]
    async fn echo_tool() {
        let result = EchoTool
            .execute(json!({"message": "hello"}), &ToolContext::new("/tmp"))
            .await
            .unwrap();
        assert_eq!(result.content, "hello");
    }
}
