//! System instructions: literal text or computed from the run context.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use super::Agent;
use crate::run::RunContext;

type SyncRender<C> = dyn Fn(&RunContext<C>, &Agent<C>) -> String + Send + Sync;
type AsyncRender<C> = dyn Fn(RunContext<C>, String) -> BoxFuture<'static, String> + Send + Sync;

/// An agent's instructions.
///
/// Computed instructions are rendered at the start of every turn the agent is
/// active, so they see context mutations made by earlier turns. The async form
/// receives the agent's name rather than the agent itself.
pub enum Instructions<C = ()> {
    None,
    Static(String),
    Dynamic(Arc<SyncRender<C>>),
    DynamicAsync(Arc<AsyncRender<C>>),
}

impl<C> Clone for Instructions<C> {
    fn clone(&self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Static(s) => Self::Static(s.clone()),
            Self::Dynamic(f) => Self::Dynamic(Arc::clone(f)),
            Self::DynamicAsync(f) => Self::DynamicAsync(Arc::clone(f)),
        }
    }
}

impl<C> Default for Instructions<C> {
    fn default() -> Self {
        Self::None
    }
}

impl<C: Send + Sync + 'static> Instructions<C> {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&RunContext<C>, &Agent<C>) -> String + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(f))
    }

    pub fn from_async_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(RunContext<C>, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = String> + Send + 'static,
    {
        Self::DynamicAsync(Arc::new(move |ctx: RunContext<C>, name: String| {
            Box::pin(f(ctx, name)) as BoxFuture<'static, String>
        }))
    }

    pub async fn render(&self, context: &RunContext<C>, agent: &Agent<C>) -> Option<String> {
        match self {
            Self::None => None,
            Self::Static(text) => Some(text.clone()),
            Self::Dynamic(f) => Some(f(context, agent)),
            Self::DynamicAsync(f) => Some(f(context.clone(), agent.name().to_string()).await),
        }
    }
}

impl<C> From<&str> for Instructions<C> {
    fn from(text: &str) -> Self {
        Self::Static(text.to_string())
    }
}

impl<C> From<String> for Instructions<C> {
    fn from(text: String) -> Self {
        Self::Static(text)
    }
}

impl<C> std::fmt::Debug for Instructions<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Static(text) => f.debug_tuple("Static").field(text).finish(),
            Self::Dynamic(_) => write!(f, "Dynamic(..)"),
            Self::DynamicAsync(_) => write!(f, "DynamicAsync(..)"),
        }
    }
}
