use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::warn;

use colloquy_core::error::Result;
use colloquy_core::types::FunctionDefinition;

/// Handler invoked when the model calls a registered function.
///
/// The returned text is fed back into the conversation as the calling
/// node's own turn. Implemented for any async closure taking the parsed
/// arguments.
pub trait FunctionHandler: Send + Sync + 'static {
    fn call(&self, args: serde_json::Value) -> BoxFuture<'_, Result<String>>;
}

impl<F, Fut> FunctionHandler for F
where
    F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<String>> + Send + 'static,
{
    fn call(&self, args: serde_json::Value) -> BoxFuture<'_, Result<String>> {
        Box::pin(self(args))
    }
}

/// A callable function: dispatch metadata plus its handler.
#[derive(Clone)]
pub struct FunctionSpec {
    /// Dispatch key; unique within a registry.
    pub name: String,
    /// Shown to the model so it can decide when to call.
    pub description: String,
    /// JSON-Schema-shaped description of the accepted arguments.
    pub parameters: serde_json::Value,
    pub handler: Arc<dyn FunctionHandler>,
}

impl FunctionSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
        handler: impl FunctionHandler,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(handler),
        }
    }

    /// The handler-less projection advertised to providers.
    pub fn definition(&self) -> FunctionDefinition {
        FunctionDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }
}

impl std::fmt::Debug for FunctionSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// Registry of callable functions, scoped to one engine instance.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    specs: HashMap<String, FunctionSpec>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a spec. Re-registering a name replaces the old spec.
    pub fn register(&mut self, spec: FunctionSpec) {
        if self.specs.insert(spec.name.clone(), spec.clone()).is_some() {
            warn!(function = %spec.name, "replacing previously registered function");
        }
    }

    pub fn get(&self, name: &str) -> Option<&FunctionSpec> {
        self.specs.get(name)
    }

    /// Definitions for the given allowlist, in allowlist order. Names
    /// without a registered spec are skipped rather than advertised.
    pub fn definitions_for(&self, allowlist: &[String]) -> Vec<FunctionDefinition> {
        allowlist
            .iter()
            .filter_map(|name| self.specs.get(name))
            .map(FunctionSpec::definition)
            .collect()
    }
}
