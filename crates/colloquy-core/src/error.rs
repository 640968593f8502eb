use thiserror::Error;

/// A failure reported by an LLM provider, classified by kind.
///
/// `Display` is the bare human-readable message, because recoverable
/// failures are copied verbatim into an error-state chat entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider rejected the request due to rate limiting.
    #[error("{0}")]
    RateLimit(String),

    /// The provider rejected the caller's credentials.
    #[error("{0}")]
    Authorization(String),

    /// The provider failed on its own side (5xx class).
    #[error("{0}")]
    Server(String),

    /// Any other failure the provider client recognized and named.
    #[error("{0}")]
    Api(String),

    /// A failure the provider client could not classify.
    #[error("{0}")]
    Unknown(String),
}

impl ProviderError {
    /// Whether the turn engine may recover locally (error entry plus
    /// `retry`) instead of propagating to the caller.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ProviderError::Unknown(_))
    }

    /// The human-readable message carried by this error.
    pub fn message(&self) -> &str {
        match self {
            Self::RateLimit(m)
            | Self::Authorization(m)
            | Self::Server(m)
            | Self::Api(m)
            | Self::Unknown(m) => m,
        }
    }
}

#[derive(Debug, Error)]
pub enum ColloquyError {
    // Provider errors
    #[error(transparent)]
    Provider(#[from] ProviderError),

    // Routing errors
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("No route between {from} and {to}")]
    UnreachableRoute { from: String, to: String },

    #[error("Manager node has no members: {0}")]
    EmptyGroup(String),

    // Function errors
    #[error("Function not available: {0}")]
    UnknownFunction(String),

    #[error("Invalid arguments for function {function}: {message}")]
    FunctionArguments { function: String, message: String },

    #[error("Function {function} failed: {message}")]
    FunctionFailed { function: String, message: String },

    // Control-flow errors
    #[error("No suspended conversation to resume")]
    NotSuspended,

    #[error("No failed turn to retry")]
    NoFailedTurn,
}

impl ColloquyError {
    /// Recoverable errors become error-state chat entries and suspend the
    /// run; everything else unwinds to the caller of `start`.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_recoverable(),
            Self::UnknownFunction(_)
            | Self::FunctionArguments { .. }
            | Self::FunctionFailed { .. } => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ColloquyError>;

/// Result of a raw provider call, before the engine classifies it.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_message_is_bare() {
        let e = ProviderError::RateLimit("401: Rate limit".into());
        assert_eq!(e.to_string(), "401: Rate limit");
        assert_eq!(e.message(), "401: Rate limit");
    }

    #[test]
    fn test_provider_error_classification() {
        assert!(ProviderError::RateLimit("x".into()).is_recoverable());
        assert!(ProviderError::Server("x".into()).is_recoverable());
        assert!(!ProviderError::Unknown("x".into()).is_recoverable());
    }

    #[test]
    fn test_engine_error_classification() {
        assert!(ColloquyError::UnknownFunction("f".into()).is_recoverable());
        assert!(ColloquyError::FunctionArguments {
            function: "f".into(),
            message: "bad json".into()
        }
        .is_recoverable());
        assert!(!ColloquyError::NotSuspended.is_recoverable());
        assert!(!ColloquyError::Provider(ProviderError::Unknown("x".into())).is_recoverable());
        assert!(ColloquyError::Provider(ProviderError::Api("x".into())).is_recoverable());
    }
}
