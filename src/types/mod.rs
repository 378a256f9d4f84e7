//! Core types shared by the run loop, tools and model clients.

mod item;
mod tool;
mod usage;

pub use item::{
    ResponseItem, Role, RunItem, RunItemKind, active_agent_after, text_message_output,
    text_message_outputs,
};
pub(crate) use item::value_to_text;
pub use tool::{ToolDefinition, ToolError, ToolOutput};
pub use usage::Usage;
