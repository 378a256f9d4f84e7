//! Resolution of a requested hand-off to the next active agent.

use std::sync::Arc;

use serde_json::Value;

use super::HandoffEdge;
use crate::agent::{Agent, AgentGraph};
use crate::run::RunContext;
use crate::types::RunItem;
use crate::{Error, Result};

/// A completed transition.
pub struct HandoffOutcome<C = ()> {
    pub target: Arc<Agent<C>>,
    /// The hand-off log entry, recording source and target.
    pub item: RunItem,
}

/// Resolve `edge` in `graph`, run its hook and produce the hand-off item.
///
/// Fails with [`Error::Handoff`] when the target is not in the graph, the call
/// arguments are not JSON, or the hook fails. Nothing is logged on failure.
pub async fn resolve_handoff<C>(
    graph: &AgentGraph<C>,
    source: &Agent<C>,
    edge: &HandoffEdge<C>,
    call_id: &str,
    arguments: &str,
    context: &RunContext<C>,
) -> Result<HandoffOutcome<C>>
where
    C: Send + Sync + 'static,
{
    let fail = |reason: String| Error::Handoff {
        source_agent: source.name().to_string(),
        target: edge.target().to_string(),
        reason,
    };

    let target = graph
        .get(edge.target())
        .ok_or_else(|| fail("agent not found in graph".to_string()))?;

    let input: Value = if arguments.trim().is_empty() {
        Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_str(arguments).map_err(|e| fail(format!("invalid arguments: {e}")))?
    };

    if let Some(hook) = edge.hook() {
        hook.on_handoff(context, &input)
            .await
            .map_err(|e| fail(format!("hook failed: {e}")))?;
    }

    tracing::debug!(
        source = source.name(),
        target = target.name(),
        "Handoff resolved"
    );

    Ok(HandoffOutcome {
        target: Arc::clone(target),
        item: RunItem::handoff(call_id, source.name(), target.name()),
    })
}
