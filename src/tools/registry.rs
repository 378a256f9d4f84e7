//! Ordered tool registry.

use std::collections::HashMap;
use std::sync::Arc;

use super::traits::Tool;
use crate::types::ToolDefinition;

/// Registry of the tools an agent exposes, in registration order.
///
/// Registering a name twice replaces the earlier tool in place.
pub struct ToolRegistry<C = ()> {
    tools: Vec<Arc<dyn Tool<C>>>,
    index: HashMap<String, usize>,
}

impl<C> ToolRegistry<C> {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool<C>>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&i) => self.tools[i] = tool,
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub fn extend(&mut self, tools: impl IntoIterator<Item = Arc<dyn Tool<C>>>) {
        for tool in tools {
            self.register(tool);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool<C>>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool<C>>> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl<C> Default for ToolRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for ToolRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            tools: self.tools.clone(),
            index: self.index.clone(),
        }
    }
}

impl<C> FromIterator<Arc<dyn Tool<C>>> for ToolRegistry<C> {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Tool<C>>>>(iter: I) -> Self {
        let mut registry = Self::new();
        registry.extend(iter);
        registry
    }
}

impl<C> std::fmt::Debug for ToolRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
