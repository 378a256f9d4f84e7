//! Boundary to the language model.
//!
//! The crate never talks to a model itself. Callers implement [`ModelClient`] over
//! their transport of choice; the run loop hands it one [`ModelRequest`] per turn.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::ModelSettings;
use crate::types::{ResponseItem, ToolDefinition, Usage};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Everything the model sees for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    /// Model name override from the run configuration.
    pub model: Option<String>,
    pub agent: String,
    /// Rendered system instructions of the active agent.
    pub instructions: Option<String>,
    /// Run input followed by every item produced so far.
    pub input: Vec<ResponseItem>,
    pub tools: Vec<ToolDefinition>,
    /// Hand-off edges of the active agent, presented as tools.
    pub handoffs: Vec<ToolDefinition>,
    /// Schema of the structured final output; `None` for plain text.
    pub output_schema: Option<Value>,
    pub settings: ModelSettings,
}

impl ModelRequest {
    /// Tool and hand-off definitions in the order the model should see them.
    pub fn all_tools(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.iter().chain(self.handoffs.iter())
    }
}

/// What the model returned for one turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Assistant messages and function calls, in model order.
    pub output: Vec<ResponseItem>,
    pub usage: Usage,
    pub response_id: Option<String>,
}

impl ModelResponse {
    pub fn new(output: Vec<ResponseItem>) -> Self {
        Self {
            output,
            usage: Usage::default(),
            response_id: None,
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_response_id(mut self, id: impl Into<String>) -> Self {
        self.response_id = Some(id.into());
        self
    }

    /// Concatenated assistant text.
    pub fn text(&self) -> String {
        self.output.iter().filter_map(ResponseItem::text).collect()
    }

    pub fn has_function_calls(&self) -> bool {
        self.output
            .iter()
            .any(|item| matches!(item, ResponseItem::FunctionCall { .. }))
    }
}

/// Transport to a language model.
///
/// Errors are passed through to the caller as [`Error::Model`](crate::Error::Model)
/// without modification.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn respond(&self, request: ModelRequest) -> Result<ModelResponse, BoxError>;
}
