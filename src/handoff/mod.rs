//! Hand-offs: transferring control of a run from one agent to another.

mod edge;
mod prompt;
mod resolver;

pub use edge::{HandoffEdge, HandoffHook, default_tool_description, default_tool_name};
pub use prompt::{RECOMMENDED_PROMPT_PREFIX, prompt_with_handoff_instructions};
pub use resolver::{HandoffOutcome, resolve_handoff};

/// Output logged for hand-off calls beyond the first in one response.
pub const MULTIPLE_HANDOFFS_MESSAGE: &str = "Multiple handoffs detected, ignoring this one.";
