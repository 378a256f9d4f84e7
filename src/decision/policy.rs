//! Completion policies: when do tool results end the run?

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::{CompletionDecision, ToolCallResult};
use crate::run::RunContext;
use crate::{Error, Result};

/// Decides whether a turn's tool results complete the run.
///
/// Implementations are bound to an agent once, at construction, and are only
/// consulted with a non-empty, request-ordered result list.
#[async_trait]
pub trait CompletionPolicy<C = ()>: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str {
        "custom"
    }

    async fn decide(
        &self,
        context: &RunContext<C>,
        results: &[ToolCallResult<C>],
    ) -> Result<CompletionDecision>;
}

/// Never final from tool results; the model sees them on the next turn.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunLlmAgain;

#[async_trait]
impl<C: Send + Sync + 'static> CompletionPolicy<C> for RunLlmAgain {
    fn name(&self) -> &str {
        "run_llm_again"
    }

    async fn decide(
        &self,
        _context: &RunContext<C>,
        _results: &[ToolCallResult<C>],
    ) -> Result<CompletionDecision> {
        Ok(CompletionDecision::not_final())
    }
}

/// The first result's output is the final output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StopOnFirstTool;

#[async_trait]
impl<C: Send + Sync + 'static> CompletionPolicy<C> for StopOnFirstTool {
    fn name(&self) -> &str {
        "stop_on_first_tool"
    }

    async fn decide(
        &self,
        _context: &RunContext<C>,
        results: &[ToolCallResult<C>],
    ) -> Result<CompletionDecision> {
        Ok(match results.first() {
            Some(first) => CompletionDecision::final_output(first.output.clone()),
            None => CompletionDecision::not_final(),
        })
    }
}

/// Final as soon as one of the named tools produced a result.
#[derive(Debug, Clone, Default)]
pub struct StopAtTools {
    names: Vec<String>,
}

impl StopAtTools {
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[async_trait]
impl<C: Send + Sync + 'static> CompletionPolicy<C> for StopAtTools {
    fn name(&self) -> &str {
        "stop_at_tools"
    }

    async fn decide(
        &self,
        _context: &RunContext<C>,
        results: &[ToolCallResult<C>],
    ) -> Result<CompletionDecision> {
        let hit = results
            .iter()
            .find(|r| self.names.iter().any(|n| n == r.tool.name()));
        Ok(match hit {
            Some(result) => CompletionDecision::final_output(result.output.clone()),
            None => CompletionDecision::not_final(),
        })
    }
}

type SyncDecider<C> =
    dyn Fn(&RunContext<C>, &[ToolCallResult<C>]) -> CompletionDecision + Send + Sync;

type AsyncDecider<C> = dyn Fn(RunContext<C>, Vec<ToolCallResult<C>>) -> BoxFuture<'static, CompletionDecision>
    + Send
    + Sync;

/// Caller-supplied closure, immediate or suspending.
pub struct FnPolicy<C = ()> {
    decider: Decider<C>,
}

enum Decider<C> {
    Sync(Box<SyncDecider<C>>),
    Async(Box<AsyncDecider<C>>),
}

impl<C: Send + Sync + 'static> FnPolicy<C> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&RunContext<C>, &[ToolCallResult<C>]) -> CompletionDecision + Send + Sync + 'static,
    {
        Self {
            decider: Decider::Sync(Box::new(f)),
        }
    }

    pub fn new_async<F, Fut>(f: F) -> Self
    where
        F: Fn(RunContext<C>, Vec<ToolCallResult<C>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CompletionDecision> + Send + 'static,
    {
        Self {
            decider: Decider::Async(Box::new(
                move |ctx: RunContext<C>, results: Vec<ToolCallResult<C>>| {
                    Box::pin(f(ctx, results)) as BoxFuture<'static, CompletionDecision>
                },
            )),
        }
    }
}

#[async_trait]
impl<C: Send + Sync + 'static> CompletionPolicy<C> for FnPolicy<C> {
    async fn decide(
        &self,
        context: &RunContext<C>,
        results: &[ToolCallResult<C>],
    ) -> Result<CompletionDecision> {
        Ok(match &self.decider {
            Decider::Sync(f) => f(context, results),
            Decider::Async(f) => f(context.clone(), results.to_vec()).await,
        })
    }
}

/// How an agent treats the results of its tool calls.
pub enum ToolUseBehavior<C = ()> {
    /// Send tool results back to the model (default).
    RunLlmAgain,
    StopOnFirstTool,
    StopAtTools(Vec<String>),
    Custom(Arc<dyn CompletionPolicy<C>>),
}

impl<C> Default for ToolUseBehavior<C> {
    fn default() -> Self {
        Self::RunLlmAgain
    }
}

impl<C: Send + Sync + 'static> ToolUseBehavior<C> {
    pub fn stop_at_tools(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::StopAtTools(names.into_iter().map(Into::into).collect())
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&RunContext<C>, &[ToolCallResult<C>]) -> CompletionDecision + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(FnPolicy::new(f)))
    }

    pub fn custom_async<F, Fut>(f: F) -> Self
    where
        F: Fn(RunContext<C>, Vec<ToolCallResult<C>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CompletionDecision> + Send + 'static,
    {
        Self::Custom(Arc::new(FnPolicy::new_async(f)))
    }

    pub fn policy(policy: impl CompletionPolicy<C> + 'static) -> Self {
        Self::Custom(Arc::new(policy))
    }

    /// Bind to the capability the run loop dispatches through.
    pub(crate) fn into_policy(self) -> Arc<dyn CompletionPolicy<C>> {
        match self {
            Self::RunLlmAgain => Arc::new(RunLlmAgain),
            Self::StopOnFirstTool => Arc::new(StopOnFirstTool),
            Self::StopAtTools(names) => Arc::new(StopAtTools::new(names)),
            Self::Custom(policy) => policy,
        }
    }
}

impl<C: Send + Sync + 'static> FromStr for ToolUseBehavior<C> {
    type Err = Error;

    /// Accepts `run_llm_again` and `stop_on_first_tool`.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "run_llm_again" => Ok(Self::RunLlmAgain),
            "stop_on_first_tool" => Ok(Self::StopOnFirstTool),
            other => Err(Error::Config(format!(
                "invalid tool_use_behavior `{other}`: expected `run_llm_again` or `stop_on_first_tool`"
            ))),
        }
    }
}

impl<C> std::fmt::Debug for ToolUseBehavior<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RunLlmAgain => write!(f, "RunLlmAgain"),
            Self::StopOnFirstTool => write!(f, "StopOnFirstTool"),
            Self::StopAtTools(names) => f.debug_tuple("StopAtTools").field(names).finish(),
            Self::Custom(policy) => f.debug_tuple("Custom").field(&policy.name()).finish(),
        }
    }
}
