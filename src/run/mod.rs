//! The run loop: turns, tool execution, hand-offs and completion.

mod config;
mod context;
mod metrics;
mod result;
mod runner;
mod turn;

#[cfg(test)]
mod tests;

pub use config::{DEFAULT_MAX_TURNS, RunConfig};
pub use context::RunContext;
pub use metrics::{RunMetrics, ToolStats};
pub use result::{RunError, RunResult, RunStatus};
pub use runner::Runner;
