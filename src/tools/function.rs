//! Closure-backed tools.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::traits::{Tool, schema_value};
use crate::output::transform_for_strict;
use crate::run::RunContext;
use crate::types::{ToolDefinition, ToolError, ToolOutput};

type Handler<C> = dyn Fn(RunContext<C>, Value) -> BoxFuture<'static, ToolOutput> + Send + Sync;

/// A tool whose body is an async closure.
///
/// The closure receives a clone of the run context handle, so the returned future
/// can be `'static` while still sharing the caller's state.
///
/// ```rust
/// use agent_relay::tools::{FunctionTool, Tool};
/// use schemars::JsonSchema;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct WeatherArgs {
///     city: String,
/// }
///
/// let tool: FunctionTool = FunctionTool::new(
///     "get_weather",
///     "Current weather for a city",
///     |_ctx, args: WeatherArgs| async move { format!("Sunny in {}", args.city) },
/// );
/// assert_eq!(tool.definition().name, "get_weather");
/// ```
pub struct FunctionTool<C = ()> {
    name: String,
    description: String,
    schema: Value,
    strict: bool,
    handler: Arc<Handler<C>>,
}

impl<C: Send + Sync + 'static> FunctionTool<C> {
    /// Typed tool: arguments are deserialized into `A`, whose schema is derived.
    pub fn new<A, F, Fut, O>(name: impl Into<String>, description: impl Into<String>, f: F) -> Self
    where
        A: JsonSchema + DeserializeOwned + Send + 'static,
        F: Fn(RunContext<C>, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: Into<ToolOutput>,
    {
        let name = name.into();
        let tool_name = name.clone();
        let f = Arc::new(f);
        let handler: Arc<Handler<C>> = Arc::new(move |ctx: RunContext<C>, input: Value| {
            let f = Arc::clone(&f);
            let tool_name = tool_name.clone();
            Box::pin(async move {
                match serde_json::from_value::<A>(input) {
                    Ok(args) => f(ctx, args).await.into(),
                    Err(e) => ToolOutput::Error(ToolError::invalid_input(tool_name, e.to_string())),
                }
            }) as BoxFuture<'static, ToolOutput>
        });

        Self {
            name,
            description: description.into(),
            schema: schema_value::<A>(),
            strict: false,
            handler,
        }
    }

    /// Untyped tool with an explicit argument schema.
    pub fn raw<F, Fut, O>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: Value,
        f: F,
    ) -> Self
    where
        F: Fn(RunContext<C>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: Into<ToolOutput>,
    {
        let handler: Arc<Handler<C>> = Arc::new(move |ctx: RunContext<C>, input: Value| {
            let fut = f(ctx, input);
            Box::pin(async move { fut.await.into() }) as BoxFuture<'static, ToolOutput>
        });

        Self {
            name: name.into(),
            description: description.into(),
            schema,
            strict: false,
            handler,
        }
    }

    /// Present the argument schema to the model in strict form.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self.schema = transform_for_strict(self.schema);
        self
    }
}

#[async_trait]
impl<C: Send + Sync + 'static> Tool<C> for FunctionTool<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        self.schema.clone()
    }

    fn definition(&self) -> ToolDefinition {
        let definition =
            ToolDefinition::new(&self.name, &self.description, self.schema.clone());
        if self.strict {
            definition.with_strict(true)
        } else {
            definition
        }
    }

    async fn execute(&self, input: Value, context: &RunContext<C>) -> ToolOutput {
        (self.handler)(context.clone(), input).await
    }
}

impl<C> std::fmt::Debug for FunctionTool<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("strict", &self.strict)
            .finish()
    }
}
