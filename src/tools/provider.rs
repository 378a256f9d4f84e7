//! External tool back-ends exposed to agents as ordinary tools.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Tool;
use crate::run::RunContext;
use crate::types::{ToolDefinition, ToolError, ToolOutput, value_to_text};

/// A tool as advertised by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ProviderToolInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Outcome of a provider call. `is_error` marks a failure reported by the tool itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderCallResult {
    pub content: Value,
    pub is_error: bool,
}

impl ProviderCallResult {
    pub fn ok(content: impl Into<Value>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<Value>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// Source of tools outside the process or outside the agent definition.
///
/// Agents list their providers' tools at the start of every turn, so a provider
/// may change its tool set between turns.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn connect(&self) -> Result<(), ToolError> {
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), ToolError> {
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<ProviderToolInfo>, ToolError>;

    async fn call_tool(&self, name: &str, arguments: Value)
    -> Result<ProviderCallResult, ToolError>;
}

/// Adapts one provider tool to [`Tool`].
pub struct ProviderTool {
    provider: Arc<dyn ToolProvider>,
    info: ProviderToolInfo,
}

impl ProviderTool {
    pub fn new(provider: Arc<dyn ToolProvider>, info: ProviderToolInfo) -> Self {
        Self { provider, info }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }
}

#[async_trait]
impl<C: Send + Sync + 'static> Tool<C> for ProviderTool {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn description(&self) -> &str {
        &self.info.description
    }

    fn input_schema(&self) -> Value {
        self.info.input_schema.clone()
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            &self.info.name,
            &self.info.description,
            self.info.input_schema.clone(),
        )
    }

    async fn execute(&self, input: Value, _context: &RunContext<C>) -> ToolOutput {
        match self.provider.call_tool(&self.info.name, input).await {
            Ok(result) if result.is_error => ToolOutput::Error(ToolError::provider(
                self.provider.name(),
                value_to_text(&result.content),
            )),
            Ok(result) => ToolOutput::Success(result.content),
            Err(e) => ToolOutput::Error(e),
        }
    }
}

/// Wrap every tool `provider` currently lists.
pub async fn provider_tools<C: Send + Sync + 'static>(
    provider: &Arc<dyn ToolProvider>,
) -> Result<Vec<Arc<dyn Tool<C>>>, ToolError> {
    let infos = provider.list_tools().await?;
    Ok(infos
        .into_iter()
        .map(|info| Arc::new(ProviderTool::new(Arc::clone(provider), info)) as Arc<dyn Tool<C>>)
        .collect())
}

type ProviderHandler =
    dyn Fn(Value) -> BoxFuture<'static, Result<Value, String>> + Send + Sync;

/// Provider whose tools are closures in this process.
pub struct InProcessProvider {
    name: String,
    tools: Vec<(ProviderToolInfo, Arc<ProviderHandler>)>,
}

impl InProcessProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tools: Vec::new(),
        }
    }

    /// Add a tool; an `Err` from `f` is reported as a tool-level failure.
    pub fn tool<F, Fut>(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        f: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, String>> + Send + 'static,
    {
        let handler: Arc<ProviderHandler> =
            Arc::new(move |args: Value| Box::pin(f(args)) as BoxFuture<'static, _>);
        self.tools
            .push((ProviderToolInfo::new(name, description, input_schema), handler));
        self
    }
}

#[async_trait]
impl ToolProvider for InProcessProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<ProviderToolInfo>, ToolError> {
        Ok(self.tools.iter().map(|(info, _)| info.clone()).collect())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ProviderCallResult, ToolError> {
        let (_, handler) = self
            .tools
            .iter()
            .find(|(info, _)| info.name == name)
            .ok_or_else(|| ToolError::provider(&self.name, format!("unknown tool `{name}`")))?;
        Ok(match handler(arguments).await {
            Ok(value) => ProviderCallResult::ok(value),
            Err(message) => ProviderCallResult::error(message),
        })
    }
}

impl std::fmt::Debug for InProcessProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InProcessProvider")
            .field("name", &self.name)
            .field(
                "tools",
                &self.tools.iter().map(|(i, _)| &i.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}
