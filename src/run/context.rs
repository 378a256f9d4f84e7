//! Shared state threaded through a run.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::types::Usage;

/// Handle to caller-owned state that every tool, hook and instruction provider sees.
///
/// The handle is cheap to clone; clones share the same state. The run loop adds no
/// locking around `C`: concurrent tool calls of one turn all hold a shared reference,
/// so a state type that is mutated by tools must bring its own interior mutability
/// (`Mutex`, `RwLock`, atomics). Mutations that complete before a turn ends are
/// visible to instruction rendering in the next turn.
pub struct RunContext<C = ()> {
    inner: Arc<ContextInner<C>>,
}

struct ContextInner<C> {
    state: C,
    requests: AtomicU32,
    input_tokens: AtomicU32,
    output_tokens: AtomicU32,
}

impl<C> RunContext<C> {
    pub fn new(state: C) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                state,
                requests: AtomicU32::new(0),
                input_tokens: AtomicU32::new(0),
                output_tokens: AtomicU32::new(0),
            }),
        }
    }

    pub fn state(&self) -> &C {
        &self.inner.state
    }

    /// Usage accumulated over every model call made with this context.
    pub fn usage(&self) -> Usage {
        Usage {
            requests: self.inner.requests.load(Ordering::Relaxed),
            input_tokens: self.inner.input_tokens.load(Ordering::Relaxed),
            output_tokens: self.inner.output_tokens.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn add_usage(&self, usage: &Usage) {
        self.inner
            .requests
            .fetch_add(usage.requests.max(1), Ordering::Relaxed);
        self.inner
            .input_tokens
            .fetch_add(usage.input_tokens, Ordering::Relaxed);
        self.inner
            .output_tokens
            .fetch_add(usage.output_tokens, Ordering::Relaxed);
    }
}

impl<C> Clone for RunContext<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Default> Default for RunContext<C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl<C: std::fmt::Debug> std::fmt::Debug for RunContext<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("state", &self.inner.state)
            .field("usage", &self.usage())
            .finish()
    }
}
