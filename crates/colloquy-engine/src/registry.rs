use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use colloquy_core::config::{NodeConfig, NodeKind};
use colloquy_core::error::{ColloquyError, Result};

/// Where messages sent by a node may go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouteTarget {
    /// A two-way channel to a single counterpart.
    Direct(String),
    /// The sub-group coordinated by the owning manager node.
    Group(Vec<String>),
}

/// The mapping from node to reachable nodes.
///
/// A direct channel is traversable in either orientation; a group target
/// connects the manager to each of its members.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingGraph {
    routes: HashMap<String, RouteTarget>,
}

impl RoutingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a two-way channel between two nodes.
    pub fn add_channel(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.routes.insert(from.into(), RouteTarget::Direct(to.into()));
    }

    /// Declare the sub-group a manager node coordinates.
    pub fn add_group(
        &mut self,
        manager: impl Into<String>,
        members: impl IntoIterator<Item = impl Into<String>>,
    ) {
        self.routes.insert(
            manager.into(),
            RouteTarget::Group(members.into_iter().map(Into::into).collect()),
        );
    }

    /// The members of `manager`'s group, if it owns one.
    pub fn members(&self, manager: &str) -> Option<&[String]> {
        match self.routes.get(manager) {
            Some(RouteTarget::Group(members)) => Some(members),
            _ => None,
        }
    }

    /// Whether a message from `from` to `to` is allowed by the graph.
    pub fn is_reachable(&self, from: &str, to: &str) -> bool {
        self.connects(from, to) || self.connects(to, from)
    }

    fn connects(&self, owner: &str, other: &str) -> bool {
        match self.routes.get(owner) {
            Some(RouteTarget::Direct(target)) => target == other,
            Some(RouteTarget::Group(members)) => members.iter().any(|m| m == other),
            None => false,
        }
    }
}

/// Per-node configuration owned by one engine instance.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    nodes: HashMap<String, NodeConfig>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, config: NodeConfig) {
        self.nodes.insert(name.into(), config);
    }

    pub fn get(&self, name: &str) -> Option<&NodeConfig> {
        self.nodes.get(name)
    }

    /// Like [`get`](Self::get), but an absent node is an error.
    pub fn require(&self, name: &str) -> Result<&NodeConfig> {
        self.nodes
            .get(name)
            .ok_or_else(|| ColloquyError::UnknownNode(name.to_string()))
    }

    pub fn is_manager(&self, name: &str) -> bool {
        matches!(self.nodes.get(name), Some(c) if c.kind == NodeKind::Manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> RoutingGraph {
        let mut g = RoutingGraph::new();
        g.add_channel("human", "team");
        g.add_group("team", ["dog", "cat", "mouse"]);
        g
    }

    #[test]
    fn test_channels_are_two_way() {
        let g = graph();
        assert!(g.is_reachable("human", "team"));
        assert!(g.is_reachable("team", "human"));
    }

    #[test]
    fn test_group_members_are_reachable_from_manager() {
        let g = graph();
        assert!(g.is_reachable("team", "cat"));
        assert!(g.is_reachable("cat", "team"));
        assert!(!g.is_reachable("human", "cat"));
        assert!(!g.is_reachable("dog", "cat"));
    }

    #[test]
    fn test_members_lookup() {
        let g = graph();
        assert_eq!(g.members("team").unwrap().len(), 3);
        assert!(g.members("human").is_none());
        assert!(g.members("ghost").is_none());
    }

    #[test]
    fn test_registry_require() {
        let mut registry = NodeRegistry::new();
        registry.insert("team", NodeConfig::manager());

        assert!(registry.is_manager("team"));
        assert!(!registry.is_manager("ghost"));
        assert!(registry.require("team").is_ok());
        assert!(matches!(
            registry.require("ghost"),
            Err(ColloquyError::UnknownNode(name)) if name == "ghost"
        ));
    }
}
