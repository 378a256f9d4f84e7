//! Agent definition and builder.

use std::sync::Arc;

use schemars::JsonSchema;

use super::{Instructions, ModelSettings};
use crate::decision::{CompletionPolicy, ToolUseBehavior};
use crate::handoff::HandoffEdge;
use crate::output::OutputSchema;
use crate::run::RunContext;
use crate::tools::{Tool, ToolProvider, ToolRegistry};
use crate::{Error, Result};

/// A participant in a run: instructions, tools, hand-off edges and completion policy.
///
/// Agents are immutable once built. Share them through an
/// [`AgentGraph`](super::AgentGraph).
pub struct Agent<C = ()> {
    name: String,
    instructions: Instructions<C>,
    handoff_description: Option<String>,
    tools: ToolRegistry<C>,
    tool_providers: Vec<Arc<dyn ToolProvider>>,
    handoffs: Vec<HandoffEdge<C>>,
    completion: Arc<dyn CompletionPolicy<C>>,
    output_schema: Option<OutputSchema>,
    model: Option<String>,
    model_settings: ModelSettings,
}

impl<C: Send + Sync + 'static> Agent<C> {
    pub fn builder(name: impl Into<String>) -> AgentBuilder<C> {
        AgentBuilder::new(name)
    }

    pub async fn render_instructions(&self, context: &RunContext<C>) -> Option<String> {
        self.instructions.render(context, self).await
    }
}

impl<C> Agent<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &Instructions<C> {
        &self.instructions
    }

    pub fn handoff_description(&self) -> Option<&str> {
        self.handoff_description.as_deref()
    }

    /// Locally registered tools. Provider tools are listed per turn by the run loop.
    pub fn tools(&self) -> &ToolRegistry<C> {
        &self.tools
    }

    pub fn tool_providers(&self) -> &[Arc<dyn ToolProvider>] {
        &self.tool_providers
    }

    pub fn handoffs(&self) -> &[HandoffEdge<C>] {
        &self.handoffs
    }

    pub fn find_handoff(&self, tool_name: &str) -> Option<&HandoffEdge<C>> {
        self.handoffs.iter().find(|e| e.tool_name() == tool_name)
    }

    pub fn completion_policy(&self) -> &Arc<dyn CompletionPolicy<C>> {
        &self.completion
    }

    pub fn output_schema(&self) -> Option<&OutputSchema> {
        self.output_schema.as_ref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn model_settings(&self) -> &ModelSettings {
        &self.model_settings
    }
}

impl<C> std::fmt::Debug for Agent<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("tools", &self.tools.names())
            .field(
                "handoffs",
                &self.handoffs.iter().map(|e| e.target()).collect::<Vec<_>>(),
            )
            .field("completion", &self.completion.name())
            .field("output_schema", &self.output_schema.as_ref().map(|s| s.name()))
            .finish()
    }
}

pub struct AgentBuilder<C = ()> {
    name: String,
    instructions: Instructions<C>,
    handoff_description: Option<String>,
    tools: ToolRegistry<C>,
    tool_providers: Vec<Arc<dyn ToolProvider>>,
    handoffs: Vec<HandoffEdge<C>>,
    behavior: Result<ToolUseBehavior<C>>,
    output_schema: Option<OutputSchema>,
    model: Option<String>,
    model_settings: ModelSettings,
}

impl<C: Send + Sync + 'static> AgentBuilder<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: Instructions::None,
            handoff_description: None,
            tools: ToolRegistry::new(),
            tool_providers: Vec::new(),
            handoffs: Vec::new(),
            behavior: Ok(ToolUseBehavior::RunLlmAgain),
            output_schema: None,
            model: None,
            model_settings: ModelSettings::default(),
        }
    }

    pub fn instructions(mut self, instructions: impl Into<Instructions<C>>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn instructions_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&RunContext<C>, &Agent<C>) -> String + Send + Sync + 'static,
    {
        self.instructions = Instructions::from_fn(f);
        self
    }

    pub fn instructions_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RunContext<C>, String) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = String> + Send + 'static,
    {
        self.instructions = Instructions::from_async_fn(f);
        self
    }

    /// Shown to other agents in the description of the hand-off tool targeting this one.
    pub fn handoff_description(mut self, description: impl Into<String>) -> Self {
        self.handoff_description = Some(description.into());
        self
    }

    pub fn tool(mut self, tool: impl Tool<C> + 'static) -> Self {
        self.tools.register(Arc::new(tool));
        self
    }

    pub fn tool_arc(mut self, tool: Arc<dyn Tool<C>>) -> Self {
        self.tools.register(tool);
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool<C>>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn tool_provider(mut self, provider: Arc<dyn ToolProvider>) -> Self {
        self.tool_providers.push(provider);
        self
    }

    /// Hand-off edge to the agent named `target` with default tool name and description.
    pub fn handoff(self, target: impl Into<String>) -> Self {
        self.handoff_edge(HandoffEdge::new(target))
    }

    pub fn handoff_edge(mut self, edge: HandoffEdge<C>) -> Self {
        self.handoffs.push(edge);
        self
    }

    pub fn tool_use_behavior(mut self, behavior: ToolUseBehavior<C>) -> Self {
        self.behavior = Ok(behavior);
        self
    }

    /// Policy by identifier; an unknown identifier fails [`build`](Self::build).
    pub fn tool_use_behavior_named(mut self, identifier: &str) -> Self {
        self.behavior = identifier.parse();
        self
    }

    pub fn output_type<T: JsonSchema>(self) -> Self {
        self.output_schema(OutputSchema::for_type::<T>())
    }

    pub fn output_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn model_settings(mut self, settings: ModelSettings) -> Self {
        self.model_settings = settings;
        self
    }

    /// Validate and bind the completion policy.
    ///
    /// Fails with a configuration error for an empty name, an unknown policy
    /// identifier, a strict output schema strict mode cannot express, or a
    /// hand-off tool name that collides with another tool.
    pub fn build(self) -> Result<Agent<C>> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("agent name must not be empty".into()));
        }

        let behavior = self.behavior?;

        if let Some(schema) = &self.output_schema {
            schema.ensure_strict_compatible()?;
        }

        {
            let mut seen = std::collections::HashSet::new();
            for edge in &self.handoffs {
                if self.tools.contains(edge.tool_name()) || !seen.insert(edge.tool_name()) {
                    return Err(Error::Config(format!(
                        "agent `{}`: duplicate tool name `{}`",
                        self.name,
                        edge.tool_name()
                    )));
                }
            }
        }

        Ok(Agent {
            name: self.name,
            instructions: self.instructions,
            handoff_description: self.handoff_description,
            tools: self.tools,
            tool_providers: self.tool_providers,
            handoffs: self.handoffs,
            completion: behavior.into_policy(),
            output_schema: self.output_schema,
            model: self.model,
            model_settings: self.model_settings,
        })
    }
}
