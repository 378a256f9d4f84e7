//! Tool trait definitions.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::output::transform_for_strict;
use crate::run::RunContext;
use crate::types::{ToolDefinition, ToolError, ToolOutput};

/// Core tool trait for all tool implementations.
///
/// `execute` receives arguments that already passed validation against
/// [`input_schema`](Tool::input_schema). Several calls of one turn may run
/// concurrently against the same context.
#[async_trait]
pub trait Tool<C = ()>: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> Value;
    async fn execute(&self, input: Value, context: &RunContext<C>) -> ToolOutput;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.input_schema())
    }
}

/// Schema-based tool trait with automatic JSON schema generation.
///
/// Provides a higher-level abstraction over `Tool` with typed inputs
/// and automatic schema derivation via schemars.
#[async_trait]
pub trait SchemaTool<C = ()>: Send + Sync {
    type Input: JsonSchema + DeserializeOwned + Send;
    const NAME: &'static str;
    const DESCRIPTION: &'static str;
    const STRICT: bool = false;

    async fn handle(&self, input: Self::Input, context: &RunContext<C>) -> ToolOutput;

    fn into_tool(self) -> TypedTool<Self>
    where
        Self: Sized,
    {
        TypedTool::new(self)
    }

    fn input_schema() -> Value {
        let value = schema_value::<Self::Input>();
        if Self::STRICT {
            transform_for_strict(value)
        } else {
            value
        }
    }
}

/// Adapter exposing a [`SchemaTool`] as a [`Tool`].
///
/// Built with [`SchemaTool::into_tool`] or [`TypedTool::new`].
#[derive(Debug, Clone)]
pub struct TypedTool<T>(T);

impl<T> TypedTool<T> {
    pub fn new(tool: T) -> Self {
        Self(tool)
    }

    pub fn inner(&self) -> &T {
        &self.0
    }
}

#[async_trait]
impl<C, T> Tool<C> for TypedTool<T>
where
    T: SchemaTool<C> + 'static,
    C: Send + Sync + 'static,
{
    fn name(&self) -> &str {
        T::NAME
    }

    fn description(&self) -> &str {
        T::DESCRIPTION
    }

    fn input_schema(&self) -> Value {
        T::input_schema()
    }

    fn definition(&self) -> ToolDefinition {
        let definition = ToolDefinition::new(T::NAME, T::DESCRIPTION, T::input_schema());
        if T::STRICT {
            definition.with_strict(true)
        } else {
            definition
        }
    }

    async fn execute(&self, input: Value, context: &RunContext<C>) -> ToolOutput {
        match serde_json::from_value::<T::Input>(input) {
            Ok(typed) => self.0.handle(typed, context).await,
            Err(e) => ToolOutput::Error(ToolError::invalid_input(T::NAME, e.to_string())),
        }
    }
}

/// JSON schema for `T`, always shaped as an object schema with `properties`.
pub(crate) fn schema_value<T: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    let mut value =
        serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({"type": "object"}));

    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        if !obj.contains_key("properties") {
            obj.insert(
                "properties".to_string(),
                Value::Object(serde_json::Map::new()),
            );
        }
    }

    value
}
