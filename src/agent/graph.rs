//! The set of agents a run may hand off between.

use std::collections::HashMap;
use std::sync::Arc;

use super::Agent;
use crate::{Error, Result};

/// Agents of one run, addressed by unique name.
///
/// Hand-off edges refer to targets by name and are resolved here at transition
/// time, so the graph may contain cycles.
pub struct AgentGraph<C = ()> {
    agents: HashMap<String, Arc<Agent<C>>>,
    order: Vec<String>,
}

impl<C> AgentGraph<C> {
    pub fn new(agents: impl IntoIterator<Item = Agent<C>>) -> Result<Self> {
        let mut graph = Self {
            agents: HashMap::new(),
            order: Vec::new(),
        };
        for agent in agents {
            graph.add(agent)?;
        }
        Ok(graph)
    }

    pub fn add(&mut self, agent: Agent<C>) -> Result<()> {
        self.add_arc(Arc::new(agent))
    }

    pub fn add_arc(&mut self, agent: Arc<Agent<C>>) -> Result<()> {
        let name = agent.name().to_string();
        if self.agents.contains_key(&name) {
            return Err(Error::Config(format!("duplicate agent name `{name}`")));
        }
        self.order.push(name.clone());
        self.agents.insert(name, agent);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Agent<C>>> {
        self.agents.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    /// Agent names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// `(source, target)` pairs whose target is not in the graph.
    ///
    /// Such edges are allowed; taking one fails at run time with a hand-off error.
    pub fn dangling_handoffs(&self) -> Vec<(&str, &str)> {
        self.order
            .iter()
            .filter_map(|name| self.agents.get(name))
            .flat_map(|agent| {
                agent
                    .handoffs()
                    .iter()
                    .filter(|edge| !self.agents.contains_key(edge.target()))
                    .map(move |edge| (agent.name(), edge.target()))
            })
            .collect()
    }
}

impl<C> std::fmt::Debug for AgentGraph<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentGraph")
            .field("agents", &self.order)
            .finish()
    }
}
