//! Agent registry
//!
//! Lookup table from agent id to implementation. Read-mostly after
//! registration; shared across executions.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Agent, AgentInfo};

/// Registry of agents keyed by their stable id
pub struct AgentRegistry {
    agents: RwLock<HashMap<String, Arc<dyn Agent>>>,
}

impl AgentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
        }
    }

    /// Register an agent under its own id
    ///
    /// Returns the previously registered agent if the id was already taken.
    pub fn register(&self, agent: Arc<dyn Agent>) -> Option<Arc<dyn Agent>> {
        let id = agent.id().to_string();
        self.agents.write().insert(id, agent)
    }

    /// Remove an agent; returns whether it was registered
    pub fn unregister(&self, agent_id: &str) -> bool {
        self.agents.write().remove(agent_id).is_some()
    }

    /// Resolve an agent by id
    pub fn get(&self, agent_id: &str) -> Option<Arc<dyn Agent>> {
        self.agents.read().get(agent_id).cloned()
    }

    /// Whether an agent with this id is registered
    pub fn contains(&self, agent_id: &str) -> bool {
        self.agents.read().contains_key(agent_id)
    }

    /// Summaries of all registered agents, sorted by id
    pub fn list(&self) -> Vec<AgentInfo> {
        let mut infos: Vec<_> = self.agents.read().values().map(|a| a.info()).collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// Number of registered agents
    pub fn len(&self) -> usize {
        self.agents.read().len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.agents.read().is_empty()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.agents.read().keys().cloned().collect();
        ids.sort();
        f.debug_struct("AgentRegistry").field("agents", &ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentError;
    use async_trait::async_trait;
    use serde_json::{Map, Value};

    struct NamedAgent(&'static str);

    #[async_trait]
    impl Agent for NamedAgent {
        fn id(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "test agent"
        }

        async fn execute(
            &self,
            input: Value,
            _context: &Map<String, Value>,
        ) -> Result<Value, AgentError> {
            Ok(input)
        }
    }

    #[test]
    fn test_register_and_get() {
        let registry = AgentRegistry::new();
        assert!(registry.register(Arc::new(NamedAgent("echo"))).is_none());

        assert!(registry.contains("echo"));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_replaces_same_id() {
        let registry = AgentRegistry::new();
        registry.register(Arc::new(NamedAgent("echo")));
        let previous = registry.register(Arc::new(NamedAgent("echo")));

        assert!(previous.is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister() {
        let registry = AgentRegistry::new();
        registry.register(Arc::new(NamedAgent("echo")));

        assert!(registry.unregister("echo"));
        assert!(!registry.unregister("echo"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_list_is_sorted() {
        let registry = AgentRegistry::new();
        registry.register(Arc::new(NamedAgent("zeta")));
        registry.register(Arc::new(NamedAgent("alpha")));

        let ids: Vec<_> = registry.list().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
    }
}
