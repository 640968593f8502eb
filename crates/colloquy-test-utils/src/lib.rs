//! Provider doubles for exercising the turn engine without a live model.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use futures::future::BoxFuture;

use colloquy_core::error::{ProviderError, ProviderResult};
use colloquy_core::traits::Provider;
use colloquy_core::types::{FunctionCall, FunctionDefinition, ProviderMessage, ProviderReply, TERMINATE};

/// One scripted step of a [`ScriptedProvider`].
#[derive(Debug, Clone)]
pub enum Script {
    /// Reply with plain text.
    Text(String),
    /// Reply with a function call.
    FunctionCall { name: String, arguments: String },
    /// Fail with the given error.
    Fail(ProviderError),
}

impl Script {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    pub fn function(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self::FunctionCall {
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    pub fn fail(error: ProviderError) -> Self {
        Self::Fail(error)
    }

    fn into_result(self) -> ProviderResult<ProviderReply> {
        match self {
            Self::Text(text) => Ok(ProviderReply::Text(text)),
            Self::FunctionCall { name, arguments } => {
                Ok(ProviderReply::FunctionCall(FunctionCall { name, arguments }))
            }
            Self::Fail(error) => Err(error),
        }
    }
}

/// A provider that plays back a fixed script and records every request.
///
/// Once the steps run out it keeps answering with the fallback, which
/// defaults to the termination keyword so leftover exchanges wind down.
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Script>>,
    fallback: Script,
    requests: Mutex<Vec<Vec<ProviderMessage>>>,
}

impl ScriptedProvider {
    pub fn new(steps: impl IntoIterator<Item = Script>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            fallback: Script::text(TERMINATE),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that answers every request with the same text.
    pub fn always(text: impl Into<String>) -> Self {
        Self::new([]).with_fallback(Script::text(text))
    }

    /// Replace the answer used once the script is exhausted.
    pub fn with_fallback(mut self, fallback: Script) -> Self {
        self.fallback = fallback;
        self
    }

    /// How many times `create` was invoked.
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every prompt received, in call order.
    pub fn requests(&self) -> Vec<Vec<ProviderMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

impl Provider for ScriptedProvider {
    fn create(
        &self,
        messages: Vec<ProviderMessage>,
        _functions: &[FunctionDefinition],
    ) -> BoxFuture<'_, ProviderResult<ProviderReply>> {
        self.requests.lock().unwrap().push(messages);
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        Box::pin(async move { step.into_result() })
    }
}

/// A provider backed by a closure over the prompt, for tests that branch
/// on the request contents (e.g. speaker-selection instructions).
pub struct FnProvider<F> {
    respond: F,
    calls: AtomicUsize,
}

impl<F> FnProvider<F>
where
    F: Fn(&[ProviderMessage]) -> ProviderResult<ProviderReply> + Send + Sync + 'static,
{
    pub fn new(respond: F) -> Self {
        Self {
            respond,
            calls: AtomicUsize::new(0),
        }
    }

    /// How many times `create` was invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<F> Provider for FnProvider<F>
where
    F: Fn(&[ProviderMessage]) -> ProviderResult<ProviderReply> + Send + Sync + 'static,
{
    fn create(
        &self,
        messages: Vec<ProviderMessage>,
        _functions: &[FunctionDefinition],
    ) -> BoxFuture<'_, ProviderResult<ProviderReply>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = (self.respond)(&messages);
        Box::pin(async move { reply })
    }
}
