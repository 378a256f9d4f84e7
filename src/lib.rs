//! # agent-relay
//!
//! Run loop for cooperating LLM agents: tool invocation, hand-offs between agents
//! and pluggable policies that decide when a run has produced its final output.
//!
//! The model transport is supplied by the caller through [`ModelClient`]; this
//! crate owns the turn loop around it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use agent_relay::{Agent, AgentGraph, ModelClient, RunConfig, RunContext, Runner};
//! use agent_relay::types::ResponseItem;
//!
//! async fn run(model: Arc<dyn ModelClient>) -> Result<(), Box<dyn std::error::Error>> {
//!     let billing = Agent::builder("Billing")
//!         .instructions("Answer billing questions.")
//!         .handoff_description("Handles invoices and refunds")
//!         .build()?;
//!     let triage = Agent::builder("Triage")
//!         .instructions("Route the customer to the right specialist.")
//!         .handoff("Billing")
//!         .build()?;
//!
//!     let graph = AgentGraph::new([triage, billing])?;
//!     let runner = Runner::new(model);
//!     let result = runner
//!         .run(
//!             &graph,
//!             "Triage",
//!             vec![ResponseItem::user("I was charged twice")],
//!             &RunContext::new(()),
//!             RunConfig::default(),
//!         )
//!         .await?;
//!
//!     println!("{} answered: {:?}", result.last_agent, result.final_output);
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod agent;
pub mod config;
pub mod decision;
pub mod handoff;
pub mod hooks;
pub mod model;
pub mod observability;
pub mod output;
pub mod prelude;
pub mod run;
pub mod tools;
pub mod types;

pub use agent::{Agent, AgentBuilder, AgentGraph, Instructions, ModelSettings, ToolChoice};
pub use decision::{
    CompletionDecision, CompletionPolicy, ToolCallResult, ToolUseBehavior, evaluate,
};
pub use handoff::{
    HandoffEdge, HandoffHook, RECOMMENDED_PROMPT_PREFIX, prompt_with_handoff_instructions,
};
pub use hooks::{Hook, HookEvent, HookInput, HookManager, HookOutput};
pub use model::{BoxError, ModelClient, ModelRequest, ModelResponse};
pub use observability::{RunSpans, TracingConfig, gen_trace_id};
pub use output::OutputSchema;
pub use run::{RunConfig, RunContext, RunError, RunMetrics, RunResult, RunStatus, Runner};
pub use tools::{
    FunctionTool, InProcessProvider, ProviderTool, SchemaTool, Tool, ToolProvider, ToolRegistry,
    TypedTool,
};
pub use types::{ResponseItem, RunItem, RunItemKind, ToolError, ToolOutput, Usage};

/// Error type for agent-relay operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Invalid agent, graph or run configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Strict mode was requested for a schema it cannot express.
    #[error("Schema `{schema}` is not strict-compatible: {reason}; build it with strict(false)")]
    StrictSchema { schema: String, reason: String },

    /// Tool call failed while the run was in fail-fast mode.
    #[error("Tool execution failed: {0}")]
    Tool(#[from] types::ToolError),

    /// Hand-off target could not be resolved or its hook failed.
    #[error("Handoff from `{source_agent}` to `{target}` failed: {reason}")]
    Handoff {
        source_agent: String,
        target: String,
        reason: String,
    },

    /// The run used every turn it was allowed without producing a final output.
    #[error("Max turns ({max_turns}) exceeded")]
    MaxTurnsExceeded { max_turns: u32 },

    /// The model client returned an error.
    #[error("Model call failed: {0}")]
    Model(#[source] BoxError),

    /// The final output did not satisfy the agent's output schema.
    #[error("Output of `{agent}` failed validation: {message}")]
    OutputValidation { agent: String, message: String },

    /// JSON serialization or deserialization failed.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error category for unified error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid configuration, raised before or at the start of a run
    Configuration,
    /// Tool and hand-off failures that become synthetic outputs unless fail-fast is set
    Recoverable,
    /// Turn limits
    ResourceLimit,
    /// Model transport errors that may succeed on retry
    Transient,
    /// Serialization and output validation errors
    Internal,
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub fn model(err: impl Into<BoxError>) -> Self {
        Error::Model(err.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::StrictSchema { .. } => ErrorCategory::Configuration,
            Error::Tool(_) | Error::Handoff { .. } => ErrorCategory::Recoverable,
            Error::MaxTurnsExceeded { .. } => ErrorCategory::ResourceLimit,
            Error::Model(_) => ErrorCategory::Transient,
            Error::OutputValidation { .. } | Error::Json(_) => ErrorCategory::Internal,
        }
    }

    pub fn is_configuration_error(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    pub fn is_recoverable(&self) -> bool {
        self.category() == ErrorCategory::Recoverable
    }

    pub fn is_resource_limit(&self) -> bool {
        self.category() == ErrorCategory::ResourceLimit
    }

    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound { key } => {
                Error::Config(format!("Key not found: {}", key))
            }
            config::ConfigError::InvalidValue { key, message } => {
                Error::Config(format!("Invalid value for {}: {}", key, message))
            }
            config::ConfigError::Serialization(e) => Error::Json(e),
            config::ConfigError::Env(e) => Error::Config(e.to_string()),
            config::ConfigError::Provider { message } => Error::Config(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::MaxTurnsExceeded { max_turns: 3 };
        assert_eq!(err.to_string(), "Max turns (3) exceeded");

        let err = Error::Handoff {
            source_agent: "Triage".into(),
            target: "Ghost".into(),
            reason: "agent not found".into(),
        };
        assert_eq!(
            err.to_string(),
            "Handoff from `Triage` to `Ghost` failed: agent not found"
        );
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn test_error_categories() {
        assert!(Error::config("bad").is_configuration_error());
        assert!(
            Error::StrictSchema {
                schema: "Scores".into(),
                reason: "open map".into(),
            }
            .is_configuration_error()
        );
        assert!(Error::Tool(ToolError::execution_failed("boom")).is_recoverable());
        assert!(Error::MaxTurnsExceeded { max_turns: 1 }.is_resource_limit());
        assert!(Error::model(std::io::Error::other("reset")).is_retryable());
    }

    #[test]
    fn test_model_error_keeps_source() {
        use std::error::Error as _;
        let err = Error::model(std::io::Error::other("connection reset"));
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "connection reset");
    }

    #[test]
    fn test_config_error_conversion() {
        let config_err = config::ConfigError::InvalidValue {
            key: "max_turns".to_string(),
            message: "expected integer".to_string(),
        };
        let err: Error = config_err.into();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("max_turns"));
    }
}
