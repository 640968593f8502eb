use serde::{Deserialize, Serialize};

/// Reply content that ends a conversation when produced verbatim.
pub const TERMINATE: &str = "TERMINATE";

/// The role of a prompt message's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Function,
}

/// The name and arguments of a function the model asked to call.
///
/// `arguments` is a JSON string generated by the model. It may be invalid
/// or carry parameters outside the declared schema, so dispatch parses it
/// defensively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// One element of the ordered prompt sent to a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl ProviderMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            name: None,
            function_call: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            name: None,
            function_call: None,
        }
    }

    /// A user message attributed to a named speaker.
    pub fn named_user(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            name: Some(name.into()),
            function_call: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            name: None,
            function_call: None,
        }
    }
}

/// A provider's reply to one prompt: plain text or a function request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderReply {
    Text(String),
    FunctionCall(FunctionCall),
}

impl From<&str> for ProviderReply {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for ProviderReply {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Delivery state of a conversation log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatState {
    Success,
    Error,
    Interrupt,
}

/// One message in the conversation log.
///
/// Entries are immutable once appended; the log's insertion order is the
/// conversation's temporal order and is replayed verbatim as prompt
/// history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub from: String,
    pub to: String,
    pub content: String,
    pub state: ChatState,
}

impl ChatEntry {
    pub fn success(from: impl Into<String>, to: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            content: content.into(),
            state: ChatState::Success,
        }
    }

    pub fn error(from: impl Into<String>, to: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            content: content.into(),
            state: ChatState::Error,
        }
    }

    /// A marker recording the route of a turn awaiting confirmation.
    pub fn interrupt(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            content: String::new(),
            state: ChatState::Interrupt,
        }
    }

    /// Whether this entry was sent by or addressed to `node`.
    pub fn involves(&self, node: &str) -> bool {
        self.from == node || self.to == node
    }
}

/// Handler-less projection of a registered function, advertised to the
/// provider for nodes that allowlist it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON-Schema-shaped description of the accepted arguments.
    pub parameters: serde_json::Value,
}
