//! One turn's worth of work: classifying the model response and running its tool calls.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::Instrument;

use super::RunContext;
use crate::agent::Agent;
use crate::handoff::HandoffEdge;
use crate::hooks::{HookInput, HookManager};
use crate::observability::{RunSpans, duration_ms};
use crate::tools::{Tool, ToolRegistry, provider_tools, validate_against_schema, validate_arguments};
use crate::types::{ResponseItem, RunItem, ToolError, ToolOutput};
use crate::{Error, Result};

/// A function call the model asked for that is not a hand-off.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ToolRequest {
    pub call_id: String,
    pub name: String,
    pub arguments: String,
}

pub(crate) struct HandoffRequest<C> {
    pub edge: HandoffEdge<C>,
    pub call_id: String,
    pub arguments: String,
}

/// A model response split by what the run loop has to do with it.
pub(crate) struct ProcessedResponse<C> {
    /// Message and function-call items, in model order.
    pub items: Vec<RunItem>,
    pub tools: Vec<ToolRequest>,
    /// First hand-off request; only one is honored per turn.
    pub handoff: Option<HandoffRequest<C>>,
    /// Call ids of hand-off requests beyond the first.
    pub ignored_handoffs: Vec<String>,
    pub message: Option<String>,
}

impl<C> ProcessedResponse<C> {
    pub fn has_calls(&self) -> bool {
        !self.tools.is_empty() || self.handoff.is_some() || !self.ignored_handoffs.is_empty()
    }
}

pub(crate) fn process_response<C>(agent: &Agent<C>, output: &[ResponseItem]) -> ProcessedResponse<C> {
    let mut processed = ProcessedResponse {
        items: Vec::with_capacity(output.len()),
        tools: Vec::new(),
        handoff: None,
        ignored_handoffs: Vec::new(),
        message: None,
    };

    for item in output {
        match item {
            ResponseItem::Message { content, .. } => {
                processed.items.push(RunItem::message(agent.name(), content.as_str()));
                processed.message = Some(content.clone());
            }
            ResponseItem::FunctionCall {
                call_id,
                name,
                arguments,
            } => {
                processed
                    .items
                    .push(RunItem::tool_call(agent.name(), item.clone()));
                match agent.find_handoff(name) {
                    Some(edge) if processed.handoff.is_none() => {
                        processed.handoff = Some(HandoffRequest {
                            edge: edge.clone(),
                            call_id: call_id.clone(),
                            arguments: arguments.clone(),
                        });
                    }
                    Some(_) => processed.ignored_handoffs.push(call_id.clone()),
                    None => processed.tools.push(ToolRequest {
                        call_id: call_id.clone(),
                        name: name.clone(),
                        arguments: arguments.clone(),
                    }),
                }
            }
            ResponseItem::FunctionCallOutput { call_id, .. } => {
                tracing::debug!(call_id = %call_id, "Ignoring function call output in model response");
            }
        }
    }

    processed
}

/// Local tools of `agent` followed by whatever its providers list right now.
///
/// A local tool shadows a provider tool of the same name.
pub(crate) async fn gather_tools<C>(agent: &Agent<C>, fail_fast: bool) -> Result<ToolRegistry<C>>
where
    C: Send + Sync + 'static,
{
    let mut registry = agent.tools().clone();
    for provider in agent.tool_providers() {
        match provider_tools::<C>(provider).await {
            Ok(tools) => {
                for tool in tools {
                    if !registry.contains(tool.name()) {
                        registry.register(tool);
                    }
                }
            }
            Err(e) if fail_fast => return Err(Error::Tool(e)),
            Err(e) => {
                tracing::warn!(provider = provider.name(), error = %e, "Failed to list provider tools");
            }
        }
    }
    Ok(registry)
}

/// Result of one tool request.
pub(crate) struct ExecutedCall<C> {
    pub request: ToolRequest,
    /// `None` when the name did not resolve to a tool.
    pub tool: Option<Arc<dyn Tool<C>>>,
    pub result: std::result::Result<Value, ToolError>,
    pub duration: Duration,
}

impl<C> ExecutedCall<C> {
    pub fn is_error(&self) -> bool {
        self.result.is_err()
    }

    /// Value reported back to the model; errors become their message.
    pub fn output(&self) -> Value {
        match &self.result {
            Ok(value) => value.clone(),
            Err(e) => Value::String(e.to_string()),
        }
    }
}

/// Runs the tool requests of one turn against one agent's tools.
pub(crate) struct ToolExecutor<'a, C> {
    pub agent: &'a Agent<C>,
    pub registry: &'a ToolRegistry<C>,
    pub context: &'a RunContext<C>,
    pub hooks: &'a HookManager<C>,
    pub spans: &'a RunSpans,
    pub tool_timeout: Option<Duration>,
}

impl<C: Send + Sync + 'static> ToolExecutor<'_, C> {
    /// Execute every request concurrently. Results are in request order.
    pub async fn execute_all(&self, requests: &[ToolRequest]) -> Vec<ExecutedCall<C>> {
        let calls = requests.iter().map(|request| self.execute(request));
        futures::future::join_all(calls).await
    }

    async fn execute(&self, request: &ToolRequest) -> ExecutedCall<C> {
        let span = self.spans.tool_span(&request.name, &request.call_id);
        let start = Instant::now();
        let tool = self.registry.get(&request.name).cloned();

        let result = match &tool {
            Some(tool) => self.invoke(tool, request).instrument(span.clone()).await,
            None => Err(ToolError::unknown_tool(&request.name, self.agent.name())),
        };
        let duration = start.elapsed();

        span.record("is_error", result.is_err());
        span.record("duration_ms", duration_ms(duration));

        let trace_id = self.spans.trace_id();
        let post = match &result {
            Ok(output) => HookInput::post_tool_use(
                trace_id,
                self.agent.name(),
                &request.name,
                &request.call_id,
                output.clone(),
            ),
            Err(e) => {
                tracing::debug!(tool = %request.name, call_id = %request.call_id, error = %e, "Tool call failed");
                HookInput::post_tool_use_failure(
                    trace_id,
                    self.agent.name(),
                    &request.name,
                    &request.call_id,
                    e.to_string(),
                )
            }
        };
        self.hooks.execute(post, self.context).await;

        ExecutedCall {
            request: request.clone(),
            tool,
            result,
            duration,
        }
    }

    async fn invoke(
        &self,
        tool: &Arc<dyn Tool<C>>,
        request: &ToolRequest,
    ) -> std::result::Result<Value, ToolError> {
        let schema = tool.input_schema();
        let args = validate_arguments(&request.name, &schema, &request.arguments)?;

        let pre = self
            .hooks
            .execute(
                HookInput::pre_tool_use(
                    self.spans.trace_id(),
                    self.agent.name(),
                    &request.name,
                    &request.call_id,
                    args.clone(),
                ),
                self.context,
            )
            .await;
        if pre.is_blocked() {
            return Err(ToolError::blocked_by_hook(
                pre.stop_reason.unwrap_or_else(|| "Blocked by hook".into()),
            ));
        }
        let args = match pre.updated_input {
            Some(updated) => {
                validate_against_schema(&request.name, &schema, &updated)?;
                updated
            }
            None => args,
        };

        let output = match self.tool_timeout {
            Some(limit) => tokio::time::timeout(limit, tool.execute(args, self.context))
                .await
                .map_err(|_| ToolError::timeout(&request.name, duration_ms(limit)))?,
            None => tool.execute(args, self.context).await,
        };

        match output {
            ToolOutput::Success(value) => Ok(value),
            ToolOutput::Error(e) => Err(e),
        }
    }
}
