//! Tools agents can call: closure-backed, schema-derived, and provider-backed.

mod function;
mod provider;
mod registry;
mod traits;
mod validate;

pub use function::FunctionTool;
pub use provider::{
    InProcessProvider, ProviderCallResult, ProviderTool, ProviderToolInfo, ToolProvider,
    provider_tools,
};
pub use registry::ToolRegistry;
pub use traits::{SchemaTool, Tool, TypedTool};
pub use validate::{validate_against_schema, validate_arguments};
