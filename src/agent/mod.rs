//! Orchestration loop.
//!
//! The [`Orchestrator`] owns one session's conversation: it sends user
//! messages to the model gateway, splits replies into text and actions,
//! parks side-effecting actions behind the [`ExecutionGate`], and after an
//! approved lead command asks the model to analyze the result. Everything the
//! user should see is emitted as an [`OutboundMessage`] on the event sink.

use crate::config::Config;
use crate::error::AgentError;
use crate::gate::{ExecutionGate, GateSettings, PendingApproval};
use crate::gateway::{HttpGateway, ModelGateway};
use crate::history::ConversationHistory;
use crate::host::{ExecLimits, Host};
use crate::runtime::OutboundMessage;
use crate::session::{Credential, SessionContext, SessionStore};
use crate::workspace::WorkspaceInspector;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

mod cycle;
mod enrich;

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Idle,
    Planning,
    AwaitingApproval,
    Executing,
    Analyzing,
}

/// Context-window and persistence knobs, taken from [`Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSettings {
    /// Most recent turns, ending with the new user message, sent with the planning call.
    pub planning_window: usize,
    /// Turns that accompany the post-command analysis call.
    pub analysis_window: usize,
    /// Characters of a read file kept in history and shown to the user.
    pub read_char_limit: usize,
    /// Save history through the [`SessionStore`] after every cycle.
    pub persist: bool,
}

impl LoopSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            planning_window: config.history.planning_window,
            analysis_window: config.history.analysis_window,
            read_char_limit: config.execution.read_char_limit,
            persist: config.history.persist,
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Drives planning, approval, execution, and analysis for one session.
pub struct Orchestrator {
    /// Chat backend (HTTP in production, scripted in tests).
    gateway: Box<dyn ModelGateway>,
    /// Source of the workspace snapshot embedded in the system prompt.
    inspector: Arc<dyn WorkspaceInspector>,
    /// Pending approvals and the host they execute against.
    gate: ExecutionGate,
    history: ConversationHistory,
    session: SessionContext,
    settings: LoopSettings,
    state: LoopState,
    /// Approval ids whose execution triggers an analysis call. Only the first
    /// run of each reply is registered here.
    follow_ups: HashSet<String>,
    /// Outbound event channel; events are dropped when unset.
    events: Option<mpsc::UnboundedSender<OutboundMessage>>,
    /// Credential and history persistence, when enabled.
    store: Option<SessionStore>,
}

impl Orchestrator {
    /// Build an orchestrator talking to the configured HTTP gateway.
    pub fn new(
        config: &Config,
        session: SessionContext,
        host: Arc<dyn Host>,
        inspector: Arc<dyn WorkspaceInspector>,
    ) -> Self {
        let gateway = HttpGateway::new(
            &config.gateway.server_url,
            Duration::from_secs(config.gateway.timeout_secs),
        );
        Self::with_gateway(config, session, Box::new(gateway), host, inspector)
    }

    /// Build an orchestrator around an explicit gateway implementation.
    pub fn with_gateway(
        config: &Config,
        session: SessionContext,
        gateway: Box<dyn ModelGateway>,
        host: Arc<dyn Host>,
        inspector: Arc<dyn WorkspaceInspector>,
    ) -> Self {
        let workspace_root = config
            .workspace
            .root
            .clone()
            .or_else(|| inspector.root().map(Path::to_path_buf));
        let gate = ExecutionGate::new(
            host,
            GateSettings {
                workspace_root,
                limits: ExecLimits {
                    timeout: Duration::from_secs(config.execution.command_timeout_secs),
                    max_buffer_bytes: config.execution.max_buffer_bytes,
                },
                output_char_limit: config.execution.output_char_limit,
            },
        );
        Self {
            gateway,
            inspector,
            gate,
            history: ConversationHistory::new(
                config.history.retention,
                config.history.turn_char_cap,
            ),
            session,
            settings: LoopSettings::from_config(config),
            state: LoopState::Idle,
            follow_ups: HashSet::new(),
            events: None,
            store: None,
        }
    }

    pub fn set_event_sink(&mut self, sink: Option<mpsc::UnboundedSender<OutboundMessage>>) {
        self.events = sink;
    }

    pub fn set_session_store(&mut self, store: Option<SessionStore>) {
        self.store = store;
    }

    /// Load the persisted transcript, if any. Returns the number of turns restored.
    pub fn restore_persisted_history(&mut self) -> usize {
        let Some(store) = &self.store else {
            return 0;
        };
        match store.load_history() {
            Ok(Some(snapshot)) => {
                self.history.restore(snapshot);
                debug!(turns = self.history.len(), "restored persisted history");
                self.history.len()
            }
            Ok(None) => 0,
            Err(err) => {
                warn!(error = %err, "failed to load persisted history");
                0
            }
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn pending(&self) -> &[PendingApproval] {
        self.gate.pending()
    }

    /// Approval id of the oldest pending run with this exact command text.
    pub fn find_pending_run(&self, command: &str) -> Option<String> {
        self.gate.find_run(command).map(|p| p.id.clone())
    }

    /// Approval id of the oldest pending write to `path`.
    pub fn find_pending_write(&self, path: &str) -> Option<String> {
        self.gate.find_write(path).map(|p| p.id.clone())
    }

    /// Run one planning cycle for a user message.
    ///
    /// Rejected with [`AgentError::CycleInFlight`] while another cycle holds
    /// the session; a rejected send leaves history untouched.
    pub async fn send(&mut self, message: &str) -> Result<(), AgentError> {
        let message = message.trim();
        if message.is_empty() {
            return Ok(());
        }
        self.session.begin_cycle()?;
        info!(session = self.session.id(), "cycle started");
        let outcome = self.plan(message).await;
        self.finish_cycle(outcome)
    }

    /// Approve or skip one pending action.
    ///
    /// Approving the lead run of a reply continues into analysis; any other
    /// resolution only surfaces its result.
    pub async fn resolve(&mut self, id: &str, approved: bool) -> Result<(), AgentError> {
        self.session.begin_cycle()?;
        let outcome = self.resolve_pending(id, approved).await;
        self.finish_cycle(outcome)
    }

    /// Forget the conversation and every pending approval.
    pub fn clear_history(&mut self) {
        self.history.clear();
        let dismissed = self.gate.dismiss_all();
        self.follow_ups.clear();
        self.session.invalidate_snapshot();
        self.state = LoopState::Idle;
        debug!(dismissed, "history cleared");
        self.persist_history();
    }

    /// Replay the retained transcript to a (re)attached surface.
    pub fn restore_history(&self) {
        let messages = self.history.transcript();
        if !messages.is_empty() {
            self.emit(OutboundMessage::RestoreHistory { messages });
        }
    }

    pub fn sign_in(&mut self, credential: Credential) {
        if let Some(store) = &self.store {
            if let Err(err) = store.save_credential(&credential) {
                warn!(error = %err, "failed to save credential");
            }
        }
        let email = credential.email.clone();
        self.session.sign_in(credential);
        self.emit(OutboundMessage::SignedIn { email });
    }

    /// End the signed-in session and continue anonymously.
    pub fn sign_out(&mut self) {
        let previous = std::mem::replace(&mut self.session, SessionContext::start(None));
        previous.end();
        if let Some(store) = &self.store {
            if let Err(err) = store.clear_credential() {
                warn!(error = %err, "failed to clear credential");
            }
        }
        self.emit(OutboundMessage::SignedOut);
    }

    /// Persist what needs persisting and end the session.
    pub fn shutdown(self) {
        self.persist_history();
        self.session.end();
    }

    fn finish_cycle(&mut self, outcome: Result<(), AgentError>) -> Result<(), AgentError> {
        self.session.end_cycle();
        self.settle();
        self.persist_history();
        if let Err(err) = &outcome {
            warn!(session = self.session.id(), error = %err, "cycle failed");
            self.emit(OutboundMessage::error(err.to_string()));
        }
        info!(session = self.session.id(), state = ?self.state, "cycle finished");
        outcome
    }

    /// Park in `AwaitingApproval` while anything is pending, otherwise `Idle`.
    fn settle(&mut self) {
        self.state = if self.gate.has_pending() {
            LoopState::AwaitingApproval
        } else {
            LoopState::Idle
        };
    }

    fn transition(&mut self, next: LoopState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "loop state");
            self.state = next;
        }
    }

    fn persist_history(&self) {
        if !self.settings.persist {
            return;
        }
        if let Some(store) = &self.store {
            if let Err(err) = store.save_history(&self.history.snapshot()) {
                warn!(error = %err, "failed to persist history");
            }
        }
    }

    fn emit(&self, event: OutboundMessage) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}
