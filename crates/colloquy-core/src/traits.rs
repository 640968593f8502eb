use futures::future::BoxFuture;

use crate::error::ProviderResult;
use crate::types::{FunctionDefinition, ProviderMessage, ProviderReply};

/// LLM provider — ordered prompt in, reply out.
///
/// Implementations are black boxes to the engine: they may call a remote
/// API, a local model, or a scripted double. Failures must be reported as
/// [`ProviderError`](crate::error::ProviderError) variants so the engine
/// can tell recoverable conditions from fatal ones.
pub trait Provider: Send + Sync + 'static {
    /// Send a prompt and receive the model's reply.
    ///
    /// `functions` lists the definitions the replying node may call; an
    /// empty slice advertises none.
    fn create(
        &self,
        messages: Vec<ProviderMessage>,
        functions: &[FunctionDefinition],
    ) -> BoxFuture<'_, ProviderResult<ProviderReply>>;
}
