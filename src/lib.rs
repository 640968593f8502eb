//! Turn-based conversation orchestration for multi-agent LLM dialogues.
//!
//! Named nodes — human proxies, LLM-backed agents, and group managers —
//! exchange messages over a routing graph. The engine drives reply turns
//! through a [`Provider`], detects the termination keyword, dispatches
//! model-requested function calls, and supports human-in-the-loop
//! interruption ([`Colloquy::resume`]) and failure replay
//! ([`Colloquy::retry`]).

pub use colloquy_core::config::{InterruptPolicy, NodeConfig, NodeKind};
pub use colloquy_core::error::{ColloquyError, ProviderError, ProviderResult, Result};
pub use colloquy_core::traits::Provider;
pub use colloquy_core::types::{
    ChatEntry, ChatState, FunctionCall, FunctionDefinition, ProviderMessage, ProviderReply, Role,
    TERMINATE,
};
pub use colloquy_engine::{
    Colloquy, ColloquyBuilder, FunctionHandler, FunctionRegistry, FunctionSpec, NodeRegistry,
    RouteTarget, RoutingGraph, RunStatus,
};
