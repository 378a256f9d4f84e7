//! Agent definitions and the graph of agents a run moves between.

mod definition;
mod graph;
mod instructions;
mod settings;

pub use definition::{Agent, AgentBuilder};
pub use graph::AgentGraph;
pub use instructions::Instructions;
pub use settings::{ModelSettings, ToolChoice};
