//! The uniform call/response wire shapes shared by every transport.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One invocation request: a tool name plus its argument object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: &str, arguments: Value) -> Self {
        Self {
            name: name.to_string(),
            arguments,
        }
    }
}

/// Content block within a tool result. Currently always text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn as_text(&self) -> &str {
        match self {
            ContentBlock::Text { text } => text,
        }
    }
}

/// Failure classification carried by every failure envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownTool,
    InvalidArguments,
    ConstraintViolation,
    StoreUnavailable,
    Timeout,
    NotImplemented,
    HandlerFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownTool => "unknown_tool",
            ErrorKind::InvalidArguments => "invalid_arguments",
            ErrorKind::ConstraintViolation => "constraint_violation",
            ErrorKind::StoreUnavailable => "store_unavailable",
            ErrorKind::Timeout => "timeout",
            ErrorKind::NotImplemented => "not_implemented",
            ErrorKind::HandlerFailure => "handler_failure",
        }
    }
}

/// The uniform success/failure wrapper returned for every tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEnvelope {
    Success { content: Vec<ContentBlock> },
    Failure { kind: ErrorKind, message: String },
}

impl ResponseEnvelope {
    pub fn success(content: Vec<ContentBlock>) -> Self {
        ResponseEnvelope::Success { content }
    }

    pub fn success_text(text: impl Into<String>) -> Self {
        ResponseEnvelope::Success {
            content: vec![ContentBlock::text(text)],
        }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        ResponseEnvelope::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ResponseEnvelope::Failure { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ResponseEnvelope::Success { .. } => None,
            ResponseEnvelope::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Concatenated text of all content blocks (failure: the message).
    pub fn text(&self) -> String {
        match self {
            ResponseEnvelope::Success { content } => content
                .iter()
                .map(ContentBlock::as_text)
                .collect::<Vec<_>>()
                .join("\n"),
            ResponseEnvelope::Failure { message, .. } => message.clone(),
        }
    }

    /// Serialize to the exact MCP result shape:
    /// `{"content":[{"type":"text","text":...}]}`, plus `"isError":true`
    /// on failure. Existing clients depend on this shape.
    pub fn to_wire(&self) -> Value {
        match self {
            ResponseEnvelope::Success { content } => json!({ "content": content }),
            ResponseEnvelope::Failure { message, .. } => json!({
                "content": [ContentBlock::text(message.clone())],
                "isError": true,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_wire_shape() {
        let env = ResponseEnvelope::success_text("Author created with id 7");
        let wire = env.to_wire();
        assert_eq!(wire["content"][0]["type"], "text");
        assert_eq!(wire["content"][0]["text"], "Author created with id 7");
        assert!(wire.get("isError").is_none());
    }

    #[test]
    fn test_failure_wire_shape() {
        let env = ResponseEnvelope::failure(ErrorKind::UnknownTool, "tool 'x' is not registered");
        let wire = env.to_wire();
        assert_eq!(wire["isError"], true);
        assert_eq!(wire["content"][0]["text"], "tool 'x' is not registered");
    }

    #[test]
    fn test_tool_call_defaults_arguments() {
        let call: ToolCall = serde_json::from_str(r#"{"name":"list_authors"}"#).unwrap();
        assert_eq!(call.name, "list_authors");
        assert!(call.arguments.is_null());
    }

    #[test]
    fn test_text_joins_blocks() {
        let env = ResponseEnvelope::success(vec![
            ContentBlock::text("line one"),
            ContentBlock::text("line two"),
        ]);
        assert_eq!(env.text(), "line one\nline two");
    }
}
