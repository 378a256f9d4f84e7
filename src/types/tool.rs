//! Tool definition, output and error types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Name, description and argument schema of a tool, as presented to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            strict: None,
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    #[error("tool `{name}` not found in agent `{agent}`")]
    UnknownTool { name: String, agent: String },

    #[error("invalid input for `{tool}`: {message}")]
    InvalidInput { tool: String, message: String },

    #[error("execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("`{tool}` timed out after {timeout_ms}ms")]
    Timeout { tool: String, timeout_ms: u64 },

    #[error("blocked by hook: {reason}")]
    BlockedByHook { reason: String },

    #[error("provider `{provider}` failed: {message}")]
    Provider { provider: String, message: String },
}

impl ToolError {
    pub fn unknown_tool(name: impl Into<String>, agent: impl Into<String>) -> Self {
        Self::UnknownTool {
            name: name.into(),
            agent: agent.into(),
        }
    }

    pub fn invalid_input(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            message: message.into(),
        }
    }

    pub fn timeout(tool: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            tool: tool.into(),
            timeout_ms,
        }
    }

    pub fn blocked_by_hook(reason: impl Into<String>) -> Self {
        Self::BlockedByHook {
            reason: reason.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// What a tool body produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Success(Value),
    Error(ToolError),
}

impl ToolOutput {
    pub fn success(value: impl Into<Value>) -> Self {
        Self::Success(value.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Success(Value::String(text.into()))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ToolError::execution_failed(message))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn as_error(&self) -> Option<&ToolError> {
        match self {
            Self::Error(e) => Some(e),
            Self::Success(_) => None,
        }
    }

    /// Value handed back to the model; errors become their message string.
    pub fn into_value(self) -> Value {
        match self {
            Self::Success(value) => value,
            Self::Error(e) => Value::String(e.to_string()),
        }
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        Self::Success(value)
    }
}

impl From<String> for ToolOutput {
    fn from(s: String) -> Self {
        Self::text(s)
    }
}

impl From<&str> for ToolOutput {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<ToolError> for ToolOutput {
    fn from(error: ToolError) -> Self {
        Self::Error(error)
    }
}

impl<T, E> From<Result<T, E>> for ToolOutput
where
    T: Into<Value>,
    E: std::fmt::Display,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Success(value.into()),
            Err(e) => Self::error(e.to_string()),
        }
    }
}
