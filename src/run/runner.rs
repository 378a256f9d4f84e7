//! The turn loop.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{Instrument, debug, info, warn};

use super::turn::{ExecutedCall, ProcessedResponse, ToolExecutor, gather_tools, process_response};
use super::{RunConfig, RunContext, RunError, RunMetrics, RunResult, RunStatus};
use crate::agent::{Agent, AgentGraph};
use crate::decision::{ToolCallResult, evaluate};
use crate::handoff::{MULTIPLE_HANDOFFS_MESSAGE, resolve_handoff};
use crate::hooks::{HookInput, HookManager};
use crate::model::{ModelClient, ModelRequest};
use crate::observability::{RunSpans, duration_ms};
use crate::types::{ResponseItem, RunItem};
use crate::{Error, Result};

/// Drives agents in an [`AgentGraph`] against a model until one produces a final output.
///
/// A runner holds no per-run state and can serve concurrent runs.
pub struct Runner<C = ()> {
    model: Arc<dyn ModelClient>,
    hooks: HookManager<C>,
}

impl<C> Clone for Runner<C> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            hooks: self.hooks.clone(),
        }
    }
}

/// How a turn ended.
enum NextStep<C> {
    RunAgain,
    Handoff(Arc<Agent<C>>),
    Final(Value),
    Interrupted(RunStatus),
}

/// Mutable state of one run.
struct RunState<C> {
    agent: Arc<Agent<C>>,
    input: Vec<ResponseItem>,
    items: Vec<RunItem>,
    turn: u32,
    metrics: RunMetrics,
}

impl<C> RunState<C> {
    fn model_input(&self) -> Vec<ResponseItem> {
        self.input
            .iter()
            .cloned()
            .chain(self.items.iter().map(RunItem::to_input_item))
            .collect()
    }
}

impl<C: Send + Sync + 'static> Runner<C> {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self {
            model,
            hooks: HookManager::new(),
        }
    }

    pub fn with_hooks(mut self, hooks: HookManager<C>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn hooks(&self) -> &HookManager<C> {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut HookManager<C> {
        &mut self.hooks
    }

    /// Run `graph` starting at `starting_agent` until a final output, a fatal error,
    /// cancellation or timeout.
    ///
    /// Fatal errors come back as [`RunError`] with every item produced before the failure.
    pub async fn run(
        &self,
        graph: &AgentGraph<C>,
        starting_agent: &str,
        input: Vec<ResponseItem>,
        context: &RunContext<C>,
        config: RunConfig,
    ) -> std::result::Result<RunResult, RunError> {
        let Some(agent) = graph.get(starting_agent).cloned() else {
            return Err(RunError {
                error: Error::Config(format!(
                    "starting agent `{starting_agent}` not found in graph"
                )),
                items: Vec::new(),
                last_agent: starting_agent.to_string(),
                turns: 0,
            });
        };

        let spans = RunSpans::new(&config.tracing);
        let run_span = spans.run_span(agent.name());
        let started = Instant::now();
        let mut state = RunState {
            agent,
            input,
            items: Vec::new(),
            turn: 0,
            metrics: RunMetrics::default(),
        };

        let outcome = self
            .drive(graph, &mut state, context, &config, &spans)
            .instrument(run_span.clone())
            .await;

        state.metrics.turns = state.turn;
        state.metrics.elapsed_ms = duration_ms(started.elapsed());
        run_span.record("last_agent", state.agent.name());
        run_span.record("turns", state.turn);

        match outcome {
            Ok((final_output, status)) => {
                info!(
                    trace_id = spans.trace_id(),
                    last_agent = state.agent.name(),
                    status = ?status,
                    turns = state.turn,
                    model_calls = state.metrics.model_calls,
                    tool_calls = state.metrics.tool_calls,
                    total_tokens = state.metrics.total_tokens(),
                    "Run finished"
                );
                Ok(RunResult {
                    final_output,
                    items: state.items,
                    input: state.input,
                    last_agent: state.agent.name().to_string(),
                    status,
                    metrics: state.metrics,
                    trace_id: spans.trace_id().to_string(),
                })
            }
            Err(error) => {
                warn!(
                    trace_id = spans.trace_id(),
                    last_agent = state.agent.name(),
                    turns = state.turn,
                    error = %error,
                    "Run failed"
                );
                Err(RunError {
                    error,
                    items: state.items,
                    last_agent: state.agent.name().to_string(),
                    turns: state.turn,
                })
            }
        }
    }

    async fn drive(
        &self,
        graph: &AgentGraph<C>,
        state: &mut RunState<C>,
        context: &RunContext<C>,
        config: &RunConfig,
        spans: &RunSpans,
    ) -> Result<(Option<Value>, RunStatus)> {
        let deadline = config.timeout.map(|t| tokio::time::Instant::now() + t);

        self.hooks
            .execute(
                HookInput::agent_start(spans.trace_id(), state.agent.name()),
                context,
            )
            .await;

        loop {
            if let Some(status) = interruption(config, deadline) {
                debug!(turn = state.turn, status = ?status, "Run interrupted");
                return Ok((None, status));
            }
            if state.turn >= config.max_turns {
                return Err(Error::MaxTurnsExceeded {
                    max_turns: config.max_turns,
                });
            }
            state.turn += 1;

            let turn_span = spans.turn_span(state.turn, state.agent.name());
            let step = self
                .run_turn(graph, state, context, config, spans, deadline)
                .instrument(turn_span)
                .await?;

            match step {
                NextStep::RunAgain => {}
                NextStep::Handoff(target) => {
                    state.agent = target;
                    self.hooks
                        .execute(
                            HookInput::agent_start(spans.trace_id(), state.agent.name()),
                            context,
                        )
                        .await;
                }
                NextStep::Final(output) => {
                    self.hooks
                        .execute(
                            HookInput::agent_end(
                                spans.trace_id(),
                                state.agent.name(),
                                Some(output.clone()),
                            ),
                            context,
                        )
                        .await;
                    return Ok((Some(output), RunStatus::Completed));
                }
                NextStep::Interrupted(status) => return Ok((None, status)),
            }
        }
    }

    async fn run_turn(
        &self,
        graph: &AgentGraph<C>,
        state: &mut RunState<C>,
        context: &RunContext<C>,
        config: &RunConfig,
        spans: &RunSpans,
        deadline: Option<tokio::time::Instant>,
    ) -> Result<NextStep<C>> {
        let agent = Arc::clone(&state.agent);
        debug!(turn = state.turn, agent = agent.name(), "Starting turn");

        let instructions = agent.render_instructions(context).await;
        let registry = gather_tools(&agent, config.fail_fast).await?;
        let handoffs = agent
            .handoffs()
            .iter()
            .map(|edge| {
                let description = graph
                    .get(edge.target())
                    .and_then(|target| target.handoff_description());
                edge.tool_definition(description)
            })
            .collect();

        let request = ModelRequest {
            model: config
                .model
                .clone()
                .or_else(|| agent.model().map(String::from)),
            agent: agent.name().to_string(),
            instructions,
            input: state.model_input(),
            tools: registry.definitions(),
            handoffs,
            output_schema: agent.output_schema().and_then(|s| s.model_schema()),
            settings: agent.model_settings().resolve(&config.model_settings),
        };

        let model_span = spans.model_span(agent.name(), request.model.as_deref());
        let call = self
            .model
            .respond(request)
            .instrument(model_span.span().clone());
        let response = tokio::select! {
            biased;
            _ = config.cancellation.cancelled() => {
                debug!("Model call abandoned on cancellation");
                return Ok(NextStep::Interrupted(RunStatus::Cancelled));
            }
            _ = wait_until(deadline) => {
                debug!("Model call abandoned on timeout");
                return Ok(NextStep::Interrupted(RunStatus::TimedOut));
            }
            response = call => response.map_err(Error::Model)?,
        };
        model_span.record_usage(response.usage.input_tokens, response.usage.output_tokens);
        model_span.finish();
        context.add_usage(&response.usage);
        state.metrics.record_model_call(&response.usage);

        let processed = process_response(&agent, &response.output);
        let has_calls = processed.has_calls();
        let ProcessedResponse {
            items,
            tools,
            handoff,
            ignored_handoffs,
            message,
        } = processed;
        state.items.extend(items);

        if !has_calls {
            let text = message.unwrap_or_default();
            debug!(agent = agent.name(), "Model produced a final message");
            let output = match agent.output_schema() {
                Some(schema) => schema.coerce(agent.name(), Value::String(text))?,
                None => Value::String(text),
            };
            return Ok(NextStep::Final(output));
        }

        let executor = ToolExecutor {
            agent: &agent,
            registry: &registry,
            context,
            hooks: &self.hooks,
            spans,
            tool_timeout: config.tool_timeout,
        };
        let executed = executor.execute_all(&tools).await;
        let results = self.record_tool_calls(&agent, executed, state, config)?;

        for call_id in ignored_handoffs {
            state.items.push(RunItem::tool_output(
                agent.name(),
                call_id,
                Value::String(MULTIPLE_HANDOFFS_MESSAGE.to_string()),
                false,
            ));
        }

        // Tools of this turn have settled; a stop requested meanwhile wins over any outcome.
        if let Some(status) = interruption(config, deadline) {
            debug!(turn = state.turn, status = ?status, "Run interrupted after tool calls");
            return Ok(NextStep::Interrupted(status));
        }

        if let Some(request) = handoff {
            let handoff_span = spans.handoff_span(agent.name(), request.edge.target());
            let resolved = resolve_handoff(
                graph,
                &agent,
                &request.edge,
                &request.call_id,
                &request.arguments,
                context,
            )
            .instrument(handoff_span)
            .await;

            match resolved {
                Ok(outcome) => {
                    info!(
                        source = agent.name(),
                        target = outcome.target.name(),
                        "Handing off"
                    );
                    state.items.push(outcome.item);
                    state.metrics.record_handoff();
                    self.hooks
                        .execute(
                            HookInput::handoff(
                                spans.trace_id(),
                                agent.name(),
                                outcome.target.name(),
                            ),
                            context,
                        )
                        .await;
                    return Ok(NextStep::Handoff(outcome.target));
                }
                Err(e) if config.fail_fast => return Err(e),
                Err(e) => {
                    warn!(error = %e, "Handoff failed, reporting to model");
                    state.items.push(RunItem::tool_output(
                        agent.name(),
                        request.call_id,
                        Value::String(e.to_string()),
                        true,
                    ));
                }
            }
        }

        let decision = evaluate(&agent, &results, context).await?;
        if !decision.is_final_output {
            return Ok(NextStep::RunAgain);
        }

        let output = decision.final_output.unwrap_or(Value::Null);
        let output = match agent.output_schema() {
            Some(schema) => schema.coerce(agent.name(), output)?,
            None => output,
        };
        Ok(NextStep::Final(output))
    }

    /// Log tool outputs in request order and collect the results the completion policy sees.
    ///
    /// Under fail-fast the first failure, in request order, aborts the run.
    fn record_tool_calls(
        &self,
        agent: &Agent<C>,
        executed: Vec<ExecutedCall<C>>,
        state: &mut RunState<C>,
        config: &RunConfig,
    ) -> Result<Vec<ToolCallResult<C>>> {
        let mut results = Vec::with_capacity(executed.len());
        for call in executed {
            let is_error = call.is_error();
            state
                .metrics
                .record_tool(&call.request.name, call.duration, is_error);

            if config.fail_fast
                && let Err(e) = &call.result
            {
                return Err(Error::Tool(e.clone()));
            }

            let output = call.output();
            let run_item =
                RunItem::tool_output(agent.name(), &call.request.call_id, output.clone(), is_error);
            state.items.push(run_item.clone());

            if let Some(tool) = call.tool {
                results.push(ToolCallResult {
                    tool,
                    output,
                    is_error,
                    run_item,
                });
            }
        }
        Ok(results)
    }
}

impl<C> std::fmt::Debug for Runner<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

fn interruption(config: &RunConfig, deadline: Option<tokio::time::Instant>) -> Option<RunStatus> {
    if config.cancellation.is_cancelled() {
        Some(RunStatus::Cancelled)
    } else if deadline.is_some_and(|d| tokio::time::Instant::now() >= d) {
        Some(RunStatus::TimedOut)
    } else {
        None
    }
}

async fn wait_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
