//! Lifecycle hooks observing and intercepting a run.

mod manager;
mod traits;

pub use manager::HookManager;
pub use traits::{FnHook, Hook, HookEvent, HookInput, HookOutput};
