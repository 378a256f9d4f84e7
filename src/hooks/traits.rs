//! Hook traits and types.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::run::RunContext;

/// Points in a run at which hooks are invoked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    /// An agent becomes active (run start or after a hand-off)
    AgentStart,

    /// The run finished with a final output from this agent
    AgentEnd,

    /// Before a tool is executed (can block or modify input)
    PreToolUse,

    /// After successful tool execution
    PostToolUse,

    /// After failed tool execution
    PostToolUseFailure,

    /// Control moved from one agent to another
    Handoff,
}

impl HookEvent {
    pub fn can_block(&self) -> bool {
        matches!(self, HookEvent::PreToolUse)
    }

    pub fn can_modify_input(&self) -> bool {
        matches!(self, HookEvent::PreToolUse)
    }

    pub fn all() -> &'static [HookEvent] {
        &[
            HookEvent::AgentStart,
            HookEvent::AgentEnd,
            HookEvent::PreToolUse,
            HookEvent::PostToolUse,
            HookEvent::PostToolUseFailure,
            HookEvent::Handoff,
        ]
    }
}

impl std::fmt::Display for HookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookEvent::AgentStart => write!(f, "agent_start"),
            HookEvent::AgentEnd => write!(f, "agent_end"),
            HookEvent::PreToolUse => write!(f, "pre_tool_use"),
            HookEvent::PostToolUse => write!(f, "post_tool_use"),
            HookEvent::PostToolUseFailure => write!(f, "post_tool_use_failure"),
            HookEvent::Handoff => write!(f, "handoff"),
        }
    }
}

/// Input data for hook execution.
#[derive(Clone, Debug)]
pub struct HookInput {
    pub event: HookEvent,

    pub trace_id: String,

    /// Agent active when the event fired; the source agent for hand-offs
    pub agent: String,

    pub tool_name: Option<String>,

    pub call_id: Option<String>,

    /// Validated arguments (PreToolUse)
    pub tool_input: Option<Value>,

    /// Tool output (PostToolUse) or final output (AgentEnd)
    pub output: Option<Value>,

    /// Error message (PostToolUseFailure)
    pub error: Option<String>,

    /// Target agent (Handoff)
    pub target_agent: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl HookInput {
    fn new(event: HookEvent, trace_id: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            event,
            trace_id: trace_id.into(),
            agent: agent.into(),
            tool_name: None,
            call_id: None,
            tool_input: None,
            output: None,
            error: None,
            target_agent: None,
            timestamp: Utc::now(),
        }
    }

    pub fn agent_start(trace_id: impl Into<String>, agent: impl Into<String>) -> Self {
        Self::new(HookEvent::AgentStart, trace_id, agent)
    }

    pub fn agent_end(
        trace_id: impl Into<String>,
        agent: impl Into<String>,
        output: Option<Value>,
    ) -> Self {
        Self {
            output,
            ..Self::new(HookEvent::AgentEnd, trace_id, agent)
        }
    }

    pub fn pre_tool_use(
        trace_id: impl Into<String>,
        agent: impl Into<String>,
        tool_name: impl Into<String>,
        call_id: impl Into<String>,
        input: Value,
    ) -> Self {
        Self {
            tool_name: Some(tool_name.into()),
            call_id: Some(call_id.into()),
            tool_input: Some(input),
            ..Self::new(HookEvent::PreToolUse, trace_id, agent)
        }
    }

    pub fn post_tool_use(
        trace_id: impl Into<String>,
        agent: impl Into<String>,
        tool_name: impl Into<String>,
        call_id: impl Into<String>,
        output: Value,
    ) -> Self {
        Self {
            tool_name: Some(tool_name.into()),
            call_id: Some(call_id.into()),
            output: Some(output),
            ..Self::new(HookEvent::PostToolUse, trace_id, agent)
        }
    }

    pub fn post_tool_use_failure(
        trace_id: impl Into<String>,
        agent: impl Into<String>,
        tool_name: impl Into<String>,
        call_id: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: Some(tool_name.into()),
            call_id: Some(call_id.into()),
            error: Some(error.into()),
            ..Self::new(HookEvent::PostToolUseFailure, trace_id, agent)
        }
    }

    pub fn handoff(
        trace_id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            target_agent: Some(target.into()),
            ..Self::new(HookEvent::Handoff, trace_id, source)
        }
    }

    pub fn tool_name(&self) -> Option<&str> {
        self.tool_name.as_deref()
    }
}

/// Output from hook execution.
#[derive(Clone, Debug)]
pub struct HookOutput {
    /// false blocks the tool call (PreToolUse only)
    pub continue_execution: bool,

    pub stop_reason: Option<String>,

    /// Replaces the tool arguments (PreToolUse only)
    pub updated_input: Option<Value>,
}

impl Default for HookOutput {
    fn default() -> Self {
        Self::allow()
    }
}

impl HookOutput {
    pub fn allow() -> Self {
        Self {
            continue_execution: true,
            stop_reason: None,
            updated_input: None,
        }
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            continue_execution: false,
            stop_reason: Some(reason.into()),
            updated_input: None,
        }
    }

    pub fn with_updated_input(mut self, input: Value) -> Self {
        self.updated_input = Some(input);
        self
    }

    pub fn is_blocked(&self) -> bool {
        !self.continue_execution
    }
}

/// Observer of run lifecycle events.
///
/// Hooks see the run context, so they can record into caller state. A hook that
/// errors or exceeds its timeout is logged and skipped; it never fails the run.
///
/// # Example
///
/// ```rust
/// use agent_relay::hooks::{Hook, HookEvent, HookInput, HookOutput};
/// use agent_relay::RunContext;
/// use async_trait::async_trait;
///
/// struct DenyRefunds;
///
/// #[async_trait]
/// impl Hook for DenyRefunds {
///     fn name(&self) -> &str {
///         "deny-refunds"
///     }
///
///     fn events(&self) -> &[HookEvent] {
///         &[HookEvent::PreToolUse]
///     }
///
///     async fn execute(&self, input: HookInput, _ctx: &RunContext)
///         -> Result<HookOutput, agent_relay::Error>
///     {
///         if input.tool_name() == Some("issue_refund") {
///             return Ok(HookOutput::block("refunds need a human"));
///         }
///         Ok(HookOutput::allow())
///     }
/// }
/// ```
#[async_trait]
pub trait Hook<C = ()>: Send + Sync {
    fn name(&self) -> &str;

    fn events(&self) -> &[HookEvent];

    /// Tool name pattern; `None` applies to all tools.
    fn tool_matcher(&self) -> Option<&Regex> {
        None
    }

    /// Per-hook timeout; `None` uses the manager default.
    fn timeout_secs(&self) -> Option<u64> {
        None
    }

    /// Higher runs first.
    fn priority(&self) -> i32 {
        0
    }

    async fn execute(
        &self,
        input: HookInput,
        ctx: &RunContext<C>,
    ) -> Result<HookOutput, crate::Error>;
}

type HookFn<C> =
    dyn Fn(HookInput, RunContext<C>) -> BoxFuture<'static, crate::Result<HookOutput>> + Send + Sync;

/// Hook backed by an async closure.
pub struct FnHook<C = ()> {
    name: String,
    events: Vec<HookEvent>,
    matcher: Option<Regex>,
    priority: i32,
    handler: Arc<HookFn<C>>,
}

impl<C: Send + Sync + 'static> FnHook<C> {
    pub fn new<F, Fut>(name: impl Into<String>, events: Vec<HookEvent>, f: F) -> Self
    where
        F: Fn(HookInput, RunContext<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = crate::Result<HookOutput>> + Send + 'static,
    {
        Self {
            name: name.into(),
            events,
            matcher: None,
            priority: 0,
            handler: Arc::new(move |input: HookInput, ctx: RunContext<C>| {
                Box::pin(f(input, ctx)) as BoxFuture<'static, crate::Result<HookOutput>>
            }),
        }
    }

    /// Restrict to tools whose name matches `pattern`.
    pub fn matching(mut self, pattern: &str) -> crate::Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| crate::Error::Config(format!("invalid hook matcher `{pattern}`: {e}")))?;
        self.matcher = Some(regex);
        Ok(self)
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

#[async_trait]
impl<C: Send + Sync + 'static> Hook<C> for FnHook<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn events(&self) -> &[HookEvent] {
        &self.events
    }

    fn tool_matcher(&self) -> Option<&Regex> {
        self.matcher.as_ref()
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn execute(&self, input: HookInput, ctx: &RunContext<C>) -> crate::Result<HookOutput> {
        (self.handler)(input, ctx.clone()).await
    }
}
