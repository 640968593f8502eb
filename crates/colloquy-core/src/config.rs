use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::traits::Provider;

/// What part a node plays in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A human proxy: the engine pauses for input on its turns unless it
    /// opts out.
    Assistant,
    /// A single LLM-backed participant.
    Agent,
    /// Coordinates a sub-group of nodes via speaker selection.
    Manager,
}

/// When the turn loop pauses for human confirmation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterruptPolicy {
    /// This node's replies never suspend the loop.
    Never,
    /// Suspend after every reply from this node.
    Always,
    /// Suspend when the addressee is a human proxy that has not opted out.
    #[default]
    Conditional,
}

/// Per-node configuration. Read-only during a run.
#[derive(Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub kind: NodeKind,
    /// Role text, sent as the leading system message of this node's
    /// prompts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Interrupt policy; the engine default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupt: Option<InterruptPolicy>,
    /// For managers: the sub-conversation round budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<usize>,
    /// Names of registered functions advertised to the provider when this
    /// node replies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<String>,
    /// Provider override; the engine default is used when absent.
    #[serde(skip)]
    pub provider: Option<Arc<dyn Provider>>,
}

impl NodeConfig {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            role: None,
            interrupt: None,
            max_rounds: None,
            functions: vec![],
            provider: None,
        }
    }

    /// A human-proxy node.
    pub fn assistant() -> Self {
        Self::new(NodeKind::Assistant)
    }

    /// A single LLM-backed agent.
    pub fn agent() -> Self {
        Self::new(NodeKind::Agent)
    }

    /// A group-coordinating manager.
    pub fn manager() -> Self {
        Self::new(NodeKind::Manager)
    }

    /// Set the role text.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the interrupt policy.
    pub fn with_interrupt(mut self, policy: InterruptPolicy) -> Self {
        self.interrupt = Some(policy);
        self
    }

    /// Set the round budget (meaningful for managers).
    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = Some(rounds);
        self
    }

    /// Set the function allowlist.
    pub fn with_functions(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.functions = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set a provider override for this node.
    pub fn with_provider(mut self, provider: impl Into<Arc<dyn Provider>>) -> Self {
        self.provider = Some(provider.into());
        self
    }
}

impl std::fmt::Debug for NodeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeConfig")
            .field("kind", &self.kind)
            .field("role", &self.role)
            .field("interrupt", &self.interrupt)
            .field("max_rounds", &self.max_rounds)
            .field("functions", &self.functions)
            .field("provider", &self.provider.is_some())
            .finish()
    }
}
