//! Hand-off edges: how an agent offers to transfer control.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::{Value, json};

use crate::run::RunContext;
use crate::types::ToolDefinition;

/// Runs when control transfers along an edge, before the target's first model call.
#[async_trait]
pub trait HandoffHook<C = ()>: Send + Sync {
    /// `input` is the parsed hand-off call arguments (`{}` when none were given).
    async fn on_handoff(&self, context: &RunContext<C>, input: &Value) -> crate::Result<()>;
}

type SyncHook<C> = dyn Fn(&RunContext<C>, &Value) -> crate::Result<()> + Send + Sync;
type AsyncHook<C> =
    dyn Fn(RunContext<C>, Value) -> BoxFuture<'static, crate::Result<()>> + Send + Sync;

enum FnHandoffHook<C> {
    Sync(Box<SyncHook<C>>),
    Async(Box<AsyncHook<C>>),
}

#[async_trait]
impl<C: Send + Sync + 'static> HandoffHook<C> for FnHandoffHook<C> {
    async fn on_handoff(&self, context: &RunContext<C>, input: &Value) -> crate::Result<()> {
        match self {
            Self::Sync(f) => f(context, input),
            Self::Async(f) => f(context.clone(), input.clone()).await,
        }
    }
}

/// Directed edge from the owning agent to `target`.
///
/// The target is named, not held, so agents may hand off to each other in cycles.
/// The name is resolved against the run's agent graph when the hand-off happens.
pub struct HandoffEdge<C = ()> {
    target: String,
    tool_name: String,
    tool_description: Option<String>,
    hook: Option<Arc<dyn HandoffHook<C>>>,
}

impl<C> Clone for HandoffEdge<C> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            tool_name: self.tool_name.clone(),
            tool_description: self.tool_description.clone(),
            hook: self.hook.clone(),
        }
    }
}

impl<C: Send + Sync + 'static> HandoffEdge<C> {
    pub fn new(target: impl Into<String>) -> Self {
        let target = target.into();
        Self {
            tool_name: default_tool_name(&target),
            target,
            tool_description: None,
            hook: None,
        }
    }

    pub fn with_tool_name(mut self, name: impl Into<String>) -> Self {
        self.tool_name = name.into();
        self
    }

    pub fn with_tool_description(mut self, description: impl Into<String>) -> Self {
        self.tool_description = Some(description.into());
        self
    }

    pub fn on_handoff(mut self, hook: impl HandoffHook<C> + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    pub fn on_handoff_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&RunContext<C>, &Value) -> crate::Result<()> + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(FnHandoffHook::Sync(Box::new(f))));
        self
    }

    pub fn on_handoff_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RunContext<C>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = crate::Result<()>> + Send + 'static,
    {
        let boxed: Box<AsyncHook<C>> = Box::new(move |ctx: RunContext<C>, input: Value| {
            Box::pin(f(ctx, input)) as BoxFuture<'static, crate::Result<()>>
        });
        self.hook = Some(Arc::new(FnHandoffHook::Async(boxed)));
        self
    }
}

impl<C> HandoffEdge<C> {
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn hook(&self) -> Option<&Arc<dyn HandoffHook<C>>> {
        self.hook.as_ref()
    }

    /// Tool presented to the model. `target_description` is the target agent's
    /// hand-off description, when the target is known.
    pub fn tool_definition(&self, target_description: Option<&str>) -> ToolDefinition {
        let description = self
            .tool_description
            .clone()
            .unwrap_or_else(|| default_tool_description(&self.target, target_description));
        ToolDefinition::new(
            &self.tool_name,
            description,
            json!({
                "type": "object",
                "properties": {},
                "required": [],
                "additionalProperties": false
            }),
        )
        .with_strict(true)
    }
}

impl<C> std::fmt::Debug for HandoffEdge<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandoffEdge")
            .field("target", &self.target)
            .field("tool_name", &self.tool_name)
            .field("has_hook", &self.hook.is_some())
            .finish()
    }
}

/// `transfer_to_<agent>` with the agent name lowercased and non-alphanumerics
/// replaced by `_`.
pub fn default_tool_name(agent_name: &str) -> String {
    let snake: String = agent_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("transfer_to_{snake}")
}

pub fn default_tool_description(agent_name: &str, handoff_description: Option<&str>) -> String {
    let mut description = format!("Handoff to the {agent_name} agent to handle the request.");
    if let Some(extra) = handoff_description.filter(|d| !d.is_empty()) {
        description.push(' ');
        description.push_str(extra);
    }
    description
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_default_tool_name() {
        assert_eq!(default_tool_name("Billing"), "transfer_to_billing");
        assert_eq!(default_tool_name("Ride Booking"), "transfer_to_ride_booking");
        assert_eq!(default_tool_name("FAQ-bot"), "transfer_to_faq_bot");
    }

    #[test]
    fn test_tool_definition_description() {
        let edge: HandoffEdge = HandoffEdge::new("Billing");
        let def = edge.tool_definition(Some("Handles invoices"));
        assert_eq!(def.name, "transfer_to_billing");
        assert_eq!(
            def.description,
            "Handoff to the Billing agent to handle the request. Handles invoices"
        );
        assert!(def.is_strict());

        let def = edge.tool_definition(None);
        assert_eq!(
            def.description,
            "Handoff to the Billing agent to handle the request."
        );

        let edge: HandoffEdge = HandoffEdge::new("Billing")
            .with_tool_name("escalate")
            .with_tool_description("Escalate to billing");
        let def = edge.tool_definition(Some("ignored"));
        assert_eq!(def.name, "escalate");
        assert_eq!(def.description, "Escalate to billing");
    }

    #[tokio::test]
    async fn test_sync_and_async_hooks() {
        let ctx = RunContext::new(AtomicUsize::new(0));

        let edge = HandoffEdge::new("B").on_handoff_fn(|ctx: &RunContext<AtomicUsize>, _input| {
            ctx.state().fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        edge.hook().unwrap().on_handoff(&ctx, &json!({})).await.unwrap();

        let edge = HandoffEdge::new("B").on_handoff_async(|ctx: RunContext<AtomicUsize>, input| async move {
            tokio::task::yield_now().await;
            ctx.state().fetch_add(10, Ordering::SeqCst);
            assert_eq!(input, json!({"reason": "billing"}));
            Ok(())
        });
        edge.hook()
            .unwrap()
            .on_handoff(&ctx, &json!({"reason": "billing"}))
            .await
            .unwrap();

        assert_eq!(ctx.state().load(Ordering::SeqCst), 11);
    }
}
