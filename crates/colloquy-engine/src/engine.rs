use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, info, warn};
use uuid::Uuid;

use colloquy_core::config::{InterruptPolicy, NodeConfig, NodeKind};
use colloquy_core::error::{ColloquyError, Result};
use colloquy_core::traits::Provider;
use colloquy_core::types::{ChatEntry, ChatState, FunctionCall, ProviderReply, TERMINATE};

use crate::events::EventHandlers;
use crate::functions::{FunctionRegistry, FunctionSpec};
use crate::group;
use crate::prompt;
use crate::registry::{NodeRegistry, RoutingGraph};

/// Reply rounds per run before the engine gives up on a conversation
/// that never terminates.
const DEFAULT_MAX_ROUNDS: usize = 100;

/// Member replies per group before a manager yields the floor.
const DEFAULT_GROUP_ROUNDS: usize = 10;

/// Where a run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// No run has been started on this engine yet.
    Idle,
    /// A turn is in flight.
    Running,
    /// The loop paused for confirmation (`resume`) or after a recoverable
    /// failure (`retry`).
    Suspended,
    /// The conversation ended: termination keyword or exhausted budget.
    Terminated,
}

/// Outcome of one reply cycle.
enum TurnOutcome {
    /// An ordinary text reply was appended.
    Replied,
    /// The replier produced the termination keyword.
    Terminated,
    /// A recoverable failure was recorded and the run suspended.
    Failed,
}

/// Turn-based conversation orchestrator.
///
/// Owns the routing graph, node and function registries, and the
/// append-only conversation log. `start` seeds the log and drives reply
/// turns until the termination keyword, a suspension point, or the round
/// budget; `resume` and `retry` pick a paused run back up. Each instance
/// is independent: registries are never shared or global.
///
/// All operations take `&mut self`, so the single-turn-in-flight rule is
/// enforced by the borrow checker rather than by locks.
pub struct Colloquy {
    provider: Arc<dyn Provider>,
    graph: RoutingGraph,
    nodes: NodeRegistry,
    functions: FunctionRegistry,
    chats: Vec<ChatEntry>,
    max_rounds: usize,
    default_interrupt: InterruptPolicy,
    handlers: EventHandlers,
    status: RunStatus,
    rounds: usize,
    group_rounds: HashMap<String, usize>,
    run_id: Uuid,
}

impl Colloquy {
    pub fn builder(provider: impl Into<Arc<dyn Provider>>) -> ColloquyBuilder {
        ColloquyBuilder::new(provider.into())
    }

    /// Read-only view of the conversation log.
    pub fn chats(&self) -> &[ChatEntry] {
        &self.chats
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Register a function for dispatch. Nodes advertise it to their
    /// provider only when their allowlist names it.
    pub fn register_function(&mut self, spec: FunctionSpec) -> &mut Self {
        self.functions.register(spec);
        self
    }

    /// Listen for every appended conversation entry.
    pub fn on_message(&mut self, listener: impl Fn(&ChatEntry) + Send + Sync + 'static) -> &mut Self {
        self.handlers.on_message(listener);
        self
    }

    /// Listen for suspension points; the listener receives the marker
    /// entry carrying the pending route.
    pub fn on_interrupt(&mut self, listener: impl Fn(&ChatEntry) + Send + Sync + 'static) -> &mut Self {
        self.handlers.on_interrupt(listener);
        self
    }

    /// Listen for classified errors recovered into the log.
    pub fn on_error(&mut self, listener: impl Fn(&ColloquyError) + Send + Sync + 'static) -> &mut Self {
        self.handlers.on_error(listener);
        self
    }

    /// Seed (or extend) the log with `content` from `from` to `to`, then
    /// drive reply turns until the conversation terminates or pauses.
    ///
    /// Recoverable provider failures are recorded in the log and reported
    /// to error listeners without unwinding; anything unclassified
    /// propagates and leaves the log as it was before the failing turn.
    pub async fn start(&mut self, from: &str, to: &str, content: impl Into<String>) -> Result<()> {
        self.nodes.require(from)?;
        self.nodes.require(to)?;
        if !self.graph.is_reachable(from, to) {
            return Err(ColloquyError::UnreachableRoute {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        self.run_id = Uuid::new_v4();
        self.status = RunStatus::Running;
        self.rounds = 0;
        self.group_rounds.clear();
        info!(run = %self.run_id, from, to, "conversation started");

        self.append_success(from, to, content.into());
        self.rounds += 1;
        self.advance(from.to_string(), to.to_string()).await
    }

    /// Resume a suspended run, optionally injecting human feedback.
    ///
    /// With feedback, the text is appended as a success entry authored by
    /// the suspended side's counterpart and the addressee replies to it.
    /// Without, the pending turn is taken as if the human had waved it
    /// through (the engine auto-replies on the pending node's behalf).
    pub async fn resume(&mut self, feedback: Option<&str>) -> Result<()> {
        if !matches!(self.chats.last(), Some(e) if e.state == ChatState::Interrupt) {
            return Err(ColloquyError::NotSuspended);
        }
        let Some(marker) = self.chats.pop() else {
            return Err(ColloquyError::NotSuspended);
        };

        self.status = RunStatus::Running;
        info!(run = %self.run_id, from = %marker.from, to = %marker.to, "conversation resumed");

        match feedback {
            Some(text) if self.nodes.is_manager(&marker.to) => {
                // feedback flows into the group channel
                self.append_success(&marker.from, &marker.to, text);
                self.rounds += 1;
                self.advance(marker.from, marker.to).await
            }
            Some(text) => {
                self.append_success(&marker.to, &marker.from, text);
                self.rounds += 1;
                self.advance(marker.to, marker.from).await
            }
            None => self.advance(marker.from, marker.to).await,
        }
    }

    /// Re-run the most recently failed turn: same route, history without
    /// the error entry.
    pub async fn retry(&mut self) -> Result<()> {
        if !matches!(self.chats.last(), Some(e) if e.state == ChatState::Error) {
            return Err(ColloquyError::NoFailedTurn);
        }
        let Some(failed) = self.chats.pop() else {
            return Err(ColloquyError::NoFailedTurn);
        };

        self.status = RunStatus::Running;
        info!(run = %self.run_id, from = %failed.to, to = %failed.from, "retrying failed turn");
        self.advance(failed.to, failed.from).await
    }

    /// Drive reply turns for the channel between `from` and `to`; the
    /// node named by `to` replies first. Returns when the run terminates,
    /// suspends, or exhausts its budget.
    async fn advance(&mut self, mut from: String, mut to: String) -> Result<()> {
        while self.status == RunStatus::Running {
            if self.nodes.require(&to)?.kind == NodeKind::Manager {
                self.run_group(&from, &to).await?;
                if self.status == RunStatus::Running {
                    // the group yielded the floor; the run is over
                    self.status = RunStatus::Terminated;
                }
                return Ok(());
            }

            match self.take_turn(&from, &to).await? {
                TurnOutcome::Terminated | TurnOutcome::Failed => return Ok(()),
                TurnOutcome::Replied => {}
            }

            self.rounds += 1;
            if self.rounds >= self.max_rounds {
                info!(run = %self.run_id, rounds = self.rounds, "round budget exhausted");
                self.status = RunStatus::Terminated;
                return Ok(());
            }

            if self.should_interrupt(&to, &from) {
                // pending turn: `from` replies next
                self.suspend(&to, &from);
                return Ok(());
            }

            std::mem::swap(&mut from, &mut to);
        }
        Ok(())
    }

    /// One reply cycle by `to`, addressed to `from`. Function calls loop
    /// here as sub-turns of the same speaker until the provider settles
    /// on text.
    async fn take_turn(&mut self, from: &str, to: &str) -> Result<TurnOutcome> {
        loop {
            let config = self.nodes.require(to)?.clone();
            let provider = config.provider.clone().unwrap_or_else(|| self.provider.clone());
            let definitions = self.functions.definitions_for(&config.functions);

            let messages = {
                // group members see the whole group channel
                let channel = if self.nodes.is_manager(from) { from } else { to };
                let history = prompt::channel_history(&self.chats, channel);
                prompt::reply_prompt(config.role.as_deref(), &history, to)
            };

            debug!(run = %self.run_id, node = to, messages = messages.len(), "requesting reply");
            match provider.create(messages, &definitions).await {
                Ok(ProviderReply::Text(text)) => {
                    let terminated = text == TERMINATE;
                    self.append_success(to, from, text);
                    if terminated {
                        info!(run = %self.run_id, node = to, "conversation terminated");
                        self.status = RunStatus::Terminated;
                        return Ok(TurnOutcome::Terminated);
                    }
                    return Ok(TurnOutcome::Replied);
                }
                Ok(ProviderReply::FunctionCall(call)) => {
                    match self.dispatch_function(&config, &call).await {
                        Ok(result) => {
                            // the result feeds back as the same speaker's turn
                            self.append_success(to, from, result);
                        }
                        Err(e) if e.is_recoverable() => {
                            self.record_failure(to, from, e);
                            return Ok(TurnOutcome::Failed);
                        }
                        Err(e) => return Err(e),
                    }
                }
                Err(e) if e.is_recoverable() => {
                    self.record_failure(to, from, ColloquyError::Provider(e));
                    return Ok(TurnOutcome::Failed);
                }
                Err(e) => {
                    warn!(run = %self.run_id, node = to, error = %e, "unclassified provider failure");
                    return Err(ColloquyError::Provider(e));
                }
            }
        }
    }

    /// Look up and invoke the function the model asked for, honoring the
    /// replier's allowlist. Every failure path is recoverable.
    async fn dispatch_function(&self, config: &NodeConfig, call: &FunctionCall) -> Result<String> {
        if !config.functions.iter().any(|name| name == &call.name) {
            return Err(ColloquyError::UnknownFunction(call.name.clone()));
        }
        let spec = self
            .functions
            .get(&call.name)
            .ok_or_else(|| ColloquyError::UnknownFunction(call.name.clone()))?;

        let args: serde_json::Value =
            serde_json::from_str(&call.arguments).map_err(|e| ColloquyError::FunctionArguments {
                function: call.name.clone(),
                message: e.to_string(),
            })?;

        debug!(run = %self.run_id, function = %call.name, "dispatching function call");
        spec.handler.call(args).await.map_err(|e| {
            // keep handler failures turn-local whatever the handler returned
            if e.is_recoverable() {
                e
            } else {
                ColloquyError::FunctionFailed {
                    function: call.name.clone(),
                    message: e.to_string(),
                }
            }
        })
    }

    /// The selection loop for manager `manager`, addressed by `from`.
    ///
    /// Boxed so nested managers can recurse. On budget exhaustion the
    /// group yields: control returns to the caller with the status
    /// untouched, and the outer loop decides whether that ends the run.
    fn run_group<'a>(&'a mut self, from: &'a str, manager: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let members: Vec<String> = self
                .graph
                .members(manager)
                .filter(|m| !m.is_empty())
                .ok_or_else(|| ColloquyError::EmptyGroup(manager.to_string()))?
                .to_vec();

            let config = self.nodes.require(manager)?.clone();
            let budget = config.max_rounds.unwrap_or(DEFAULT_GROUP_ROUNDS);
            let provider = config.provider.clone().unwrap_or_else(|| self.provider.clone());
            let mut previous: Option<String> = None;

            while self.status == RunStatus::Running {
                let spoken = self.group_rounds.get(manager).copied().unwrap_or(0);
                if spoken >= budget {
                    info!(run = %self.run_id, manager, rounds = spoken, "group budget exhausted, yielding the floor");
                    return Ok(());
                }

                let context = {
                    let history = prompt::channel_history(&self.chats, manager);
                    prompt::selection_context(config.role.as_deref(), &history)
                };
                let speaker = match group::select_speaker(
                    provider.as_ref(),
                    context,
                    &members,
                    previous.as_deref(),
                )
                .await
                {
                    Ok(speaker) => speaker,
                    Err(e) if e.is_recoverable() => {
                        self.record_failure(manager, from, ColloquyError::Provider(e));
                        return Ok(());
                    }
                    Err(e) => return Err(ColloquyError::Provider(e)),
                };

                if self.nodes.require(&speaker)?.kind == NodeKind::Manager {
                    // nested group: relay the floor downward; its replies
                    // land in the shared log and cost this manager one round
                    self.run_group(manager, &speaker).await?;
                    if self.status != RunStatus::Running {
                        return Ok(());
                    }
                    *self.group_rounds.entry(manager.to_string()).or_insert(0) += 1;
                } else {
                    match self.take_turn(manager, &speaker).await? {
                        TurnOutcome::Terminated | TurnOutcome::Failed => return Ok(()),
                        TurnOutcome::Replied => {
                            *self.group_rounds.entry(manager.to_string()).or_insert(0) += 1;
                            if self.should_interrupt(&speaker, manager) {
                                // resuming re-enters this selection loop
                                self.suspend(from, manager);
                                return Ok(());
                            }
                        }
                    }
                }

                previous = Some(speaker);
            }
            Ok(())
        })
    }

    /// Whether the loop pauses after `replied`'s reply to `addressee`.
    fn should_interrupt(&self, replied: &str, addressee: &str) -> bool {
        match self.effective_interrupt(replied) {
            InterruptPolicy::Always => true,
            InterruptPolicy::Never => false,
            InterruptPolicy::Conditional => match self.nodes.get(addressee) {
                // pause when the floor passes to a human proxy that has
                // not opted out
                Some(config) => {
                    config.kind == NodeKind::Assistant
                        && self.effective_interrupt(addressee) != InterruptPolicy::Never
                }
                None => false,
            },
        }
    }

    fn effective_interrupt(&self, node: &str) -> InterruptPolicy {
        self.nodes
            .get(node)
            .and_then(|config| config.interrupt)
            .unwrap_or(self.default_interrupt)
    }

    fn append_success(&mut self, from: &str, to: &str, content: impl Into<String>) {
        self.chats.push(ChatEntry::success(from, to, content));
        if let Some(entry) = self.chats.last() {
            self.handlers.emit_message(entry);
        }
    }

    fn record_failure(&mut self, replier: &str, addressee: &str, error: ColloquyError) {
        warn!(run = %self.run_id, node = replier, error = %error, "recoverable turn failure");
        self.chats.push(ChatEntry::error(replier, addressee, error.to_string()));
        self.status = RunStatus::Suspended;
        self.handlers.emit_error(&error);
    }

    fn suspend(&mut self, from: &str, to: &str) {
        debug!(run = %self.run_id, from, to, "awaiting confirmation");
        self.chats.push(ChatEntry::interrupt(from, to));
        self.status = RunStatus::Suspended;
        if let Some(entry) = self.chats.last() {
            self.handlers.emit_interrupt(entry);
        }
    }
}

impl std::fmt::Debug for Colloquy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Colloquy")
            .field("status", &self.status)
            .field("chats", &self.chats.len())
            .field("rounds", &self.rounds)
            .field("max_rounds", &self.max_rounds)
            .finish()
    }
}

/// Builder for [`Colloquy`] instances.
pub struct ColloquyBuilder {
    provider: Arc<dyn Provider>,
    graph: RoutingGraph,
    nodes: NodeRegistry,
    chats: Vec<ChatEntry>,
    max_rounds: usize,
    default_interrupt: InterruptPolicy,
}

impl ColloquyBuilder {
    fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            graph: RoutingGraph::new(),
            nodes: NodeRegistry::new(),
            chats: Vec::new(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            default_interrupt: InterruptPolicy::Conditional,
        }
    }

    /// Open a two-way channel between two nodes.
    pub fn channel(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.graph.add_channel(from, to);
        self
    }

    /// Declare the sub-group a manager node coordinates.
    pub fn group(
        mut self,
        manager: impl Into<String>,
        members: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.graph.add_group(manager, members);
        self
    }

    /// Configure a node.
    pub fn node(mut self, name: impl Into<String>, config: NodeConfig) -> Self {
        self.nodes.insert(name, config);
        self
    }

    /// Seed the conversation log with entries from an earlier run.
    pub fn seed(mut self, chats: Vec<ChatEntry>) -> Self {
        self.chats = chats;
        self
    }

    /// Cap the reply rounds per run (default 100).
    pub fn max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds;
        self
    }

    /// Default interrupt policy for nodes that do not set their own.
    pub fn interrupt(mut self, policy: InterruptPolicy) -> Self {
        self.default_interrupt = policy;
        self
    }

    pub fn build(self) -> Colloquy {
        Colloquy {
            provider: self.provider,
            graph: self.graph,
            nodes: self.nodes,
            functions: FunctionRegistry::new(),
            chats: self.chats,
            max_rounds: self.max_rounds,
            default_interrupt: self.default_interrupt,
            handlers: EventHandlers::default(),
            status: RunStatus::Idle,
            rounds: 0,
            group_rounds: HashMap::new(),
            run_id: Uuid::nil(),
        }
    }
}
