//! Prelude module for convenient imports.
//!
//! ```rust
//! use agent_relay::prelude::*;
//! ```

// Core types
pub use crate::{Error, ErrorCategory, Result};

// Agents
pub use crate::agent::{Agent, AgentBuilder, AgentGraph, Instructions, ModelSettings, ToolChoice};

// Run loop
pub use crate::run::{RunConfig, RunContext, RunError, RunResult, RunStatus, Runner};

// Model transport
pub use crate::model::{ModelClient, ModelRequest, ModelResponse};

// Tools
pub use crate::tools::{FunctionTool, SchemaTool, Tool, ToolProvider, ToolRegistry, TypedTool};
pub use crate::types::{ResponseItem, RunItem, RunItemKind, ToolError, ToolOutput, Usage};

// Decisions and hand-offs
pub use crate::decision::{CompletionDecision, CompletionPolicy, ToolCallResult, ToolUseBehavior};
pub use crate::handoff::HandoffEdge;

// Hooks
pub use crate::hooks::{Hook, HookEvent, HookInput, HookManager, HookOutput};

// Output
pub use crate::output::OutputSchema;
