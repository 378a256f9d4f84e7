//! Final-output decisions over a turn's tool results.

mod policy;

pub use policy::{
    CompletionPolicy, FnPolicy, RunLlmAgain, StopAtTools, StopOnFirstTool, ToolUseBehavior,
};

use std::sync::Arc;

use serde_json::Value;

use crate::Result;
use crate::agent::Agent;
use crate::run::RunContext;
use crate::tools::Tool;
use crate::types::RunItem;

/// Whether the run is complete, and with what output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionDecision {
    pub is_final_output: bool,
    pub final_output: Option<Value>,
}

impl CompletionDecision {
    pub fn not_final() -> Self {
        Self::default()
    }

    pub fn final_output(output: impl Into<Value>) -> Self {
        Self {
            is_final_output: true,
            final_output: Some(output.into()),
        }
    }
}

/// One executed tool call: the tool, its output and the log item recording it.
pub struct ToolCallResult<C = ()> {
    pub tool: Arc<dyn Tool<C>>,
    pub output: Value,
    pub is_error: bool,
    pub run_item: RunItem,
}

impl<C> Clone for ToolCallResult<C> {
    fn clone(&self) -> Self {
        Self {
            tool: Arc::clone(&self.tool),
            output: self.output.clone(),
            is_error: self.is_error,
            run_item: self.run_item.clone(),
        }
    }
}

impl<C> std::fmt::Debug for ToolCallResult<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCallResult")
            .field("tool", &self.tool.name())
            .field("output", &self.output)
            .field("is_error", &self.is_error)
            .finish()
    }
}

/// Apply `agent`'s completion policy to a turn's results.
///
/// An empty result list is never final and does not consult the policy.
pub async fn evaluate<C>(
    agent: &Agent<C>,
    tool_results: &[ToolCallResult<C>],
    context: &RunContext<C>,
) -> Result<CompletionDecision>
where
    C: Send + Sync + 'static,
{
    if tool_results.is_empty() {
        return Ok(CompletionDecision::not_final());
    }
    let policy = agent.completion_policy();
    let decision = policy.decide(context, tool_results).await?;
    tracing::debug!(
        agent = agent.name(),
        policy = policy.name(),
        results = tool_results.len(),
        is_final = decision.is_final_output,
        "Evaluated tool results"
    );
    Ok(decision)
}
