//! Hook manager for registering and executing hooks.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::time::{Duration, timeout};

use super::{Hook, HookEvent, HookInput, HookOutput};
use crate::run::RunContext;

pub struct HookManager<C = ()> {
    hooks: Vec<Arc<dyn Hook<C>>>,
    cache: HashMap<HookEvent, Vec<usize>>,
    default_timeout_secs: u64,
}

impl<C> Default for HookManager<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for HookManager<C> {
    fn clone(&self) -> Self {
        Self {
            hooks: self.hooks.clone(),
            cache: self.cache.clone(),
            default_timeout_secs: self.default_timeout_secs,
        }
    }
}

impl<C> HookManager<C> {
    pub fn new() -> Self {
        Self::with_timeout(60)
    }

    pub fn with_timeout(timeout_secs: u64) -> Self {
        Self {
            hooks: Vec::new(),
            cache: HashMap::new(),
            default_timeout_secs: timeout_secs,
        }
    }

    fn rebuild_cache(&mut self) {
        self.cache.clear();
        for event in HookEvent::all() {
            let mut indices: Vec<usize> = self
                .hooks
                .iter()
                .enumerate()
                .filter(|(_, h)| h.events().contains(event))
                .map(|(i, _)| i)
                .collect();
            indices.sort_by_key(|&i| std::cmp::Reverse(self.hooks[i].priority()));
            self.cache.insert(*event, indices);
        }
    }

    pub fn register<H: Hook<C> + 'static>(&mut self, hook: H) {
        self.register_arc(Arc::new(hook));
    }

    pub fn register_arc(&mut self, hook: Arc<dyn Hook<C>>) {
        self.hooks.push(hook);
        self.rebuild_cache();
    }

    pub fn unregister(&mut self, name: &str) {
        self.hooks.retain(|h| h.name() != name);
        self.rebuild_cache();
    }

    pub fn hook_names(&self) -> Vec<&str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    pub fn has_hook(&self, name: &str) -> bool {
        self.hooks.iter().any(|h| h.name() == name)
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    #[inline]
    pub fn hooks_for_event(&self, event: HookEvent) -> Vec<&Arc<dyn Hook<C>>> {
        self.cache
            .get(&event)
            .map(|indices| indices.iter().map(|&i| &self.hooks[i]).collect())
            .unwrap_or_default()
    }

    /// Run every hook registered for `input.event`, in priority order.
    ///
    /// Stops at the first block. Later `updated_input` values override earlier ones.
    pub async fn execute(&self, input: HookInput, ctx: &RunContext<C>) -> HookOutput {
        let hooks = self.hooks_for_event(input.event);
        let mut merged = HookOutput::allow();

        for hook in hooks {
            if let (Some(matcher), Some(tool_name)) = (hook.tool_matcher(), input.tool_name())
                && !matcher.is_match(tool_name)
            {
                continue;
            }

            let hook_timeout = hook.timeout_secs().unwrap_or(self.default_timeout_secs);
            let result = timeout(
                Duration::from_secs(hook_timeout),
                hook.execute(input.clone(), ctx),
            )
            .await;

            let output = match result {
                Ok(Ok(output)) => output,
                Ok(Err(e)) => {
                    tracing::warn!(hook = hook.name(), event = %input.event, error = %e, "Hook execution failed");
                    continue;
                }
                Err(_) => {
                    tracing::warn!(
                        hook = hook.name(),
                        event = %input.event,
                        timeout_secs = hook_timeout,
                        "Hook timed out"
                    );
                    continue;
                }
            };

            merged = Self::merge_outputs(merged, output, input.event);

            if merged.is_blocked() {
                tracing::debug!(hook = hook.name(), reason = ?merged.stop_reason, "Hook blocked");
                break;
            }
        }

        merged
    }

    fn merge_outputs(base: HookOutput, new: HookOutput, event: HookEvent) -> HookOutput {
        if !event.can_block() {
            return base;
        }
        HookOutput {
            continue_execution: base.continue_execution && new.continue_execution,
            stop_reason: new.stop_reason.or(base.stop_reason),
            updated_input: new.updated_input.or(base.updated_input),
        }
    }
}

impl<C> std::fmt::Debug for HookManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookManager")
            .field("hook_names", &self.hook_names())
            .field("default_timeout_secs", &self.default_timeout_secs)
            .finish()
    }
}
