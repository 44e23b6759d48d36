//! Planning, execution, and analysis steps of one cycle.

use super::{LoopState, Orchestrator};
use crate::error::AgentError;
use crate::gate::{CommandResult, ExecutionResult, GatedAction, Resolution};
use crate::gateway::prompt::{render_command_report, render_system_prompt, ANALYSIS_DIRECTIVE};
use crate::parser::{self, ParsedAction};
use crate::runtime::{ActionPrompt, OutboundMessage};
use crate::textutil::prefix_by_chars;
use crate::types::{ChatRequest, Message};
use tracing::{debug, info};

impl Orchestrator {
    /// `Idle -> Planning`: ask the model about a new user message.
    pub(super) async fn plan(&mut self, message: &str) -> Result<(), AgentError> {
        self.transition(LoopState::Planning);
        self.emit(OutboundMessage::thinking("Thinking..."));

        // The window is taken after the append, so it ends with this turn.
        self.history.append_user(message);
        let window = self.history.context_window(self.settings.planning_window);
        let prompt = self.enrich_message(message).await;

        let request = ChatRequest::new(prompt, self.system_prompt(), window);
        let reply = self.gateway.complete(&request, &self.session).await?;
        self.handle_reply(&reply).await;
        Ok(())
    }

    /// `AwaitingApproval -> Executing`, then `Analyzing` for a lead run.
    pub(super) async fn resolve_pending(
        &mut self,
        id: &str,
        approved: bool,
    ) -> Result<(), AgentError> {
        if approved {
            if let Some(pending) = self.gate.get(id) {
                let progress = match &pending.action {
                    GatedAction::RunCommand { command } => format!("Running: {command}"),
                    GatedAction::WriteFile { path, .. } => format!("Writing: {path}"),
                };
                self.transition(LoopState::Executing);
                self.emit(OutboundMessage::thinking(progress));
            }
        }

        let resolution = self.gate.resolve(id, approved).await?;
        let follow_up = self.follow_ups.remove(id);
        let result = match resolution {
            Resolution::Skipped(pending) => {
                info!(id, kind = pending.action.label(), "approval skipped");
                return Ok(());
            }
            Resolution::Executed(result) => result,
        };

        let summary = result.summary();
        self.history.append_assistant(summary.clone());
        self.emit(OutboundMessage::response(summary));
        // The action may have changed the project on disk.
        self.session.invalidate_snapshot();

        match result {
            ExecutionResult::Command(command) if follow_up => self.analyze(&command).await,
            _ => Ok(()),
        }
    }

    /// Ask the model to interpret a finished command.
    async fn analyze(&mut self, result: &CommandResult) -> Result<(), AgentError> {
        self.transition(LoopState::Analyzing);
        self.emit(OutboundMessage::thinking("Analyzing results..."));

        let mut window = self.history.context_window(self.settings.analysis_window);
        window.push(Message::user(render_command_report(
            &result.command,
            result.exit_code,
            &result.output,
        )));

        let request = ChatRequest::new(ANALYSIS_DIRECTIVE, self.system_prompt(), window);
        let reply = self.gateway.complete(&request, &self.session).await?;
        self.handle_reply(&reply).await;
        Ok(())
    }

    /// Surface text, resolve reads, and park runs and writes for approval.
    async fn handle_reply(&mut self, reply: &str) {
        let actions = parser::parse(reply);
        if actions.is_empty() {
            debug!("model reply was empty");
            return;
        }

        let mut lead_run_registered = false;
        for action in actions {
            match action {
                ParsedAction::Text { content } => {
                    self.history.append_assistant(content.clone());
                    self.emit(OutboundMessage::response(content));
                }
                ParsedAction::ReadFile { path } => {
                    self.emit(OutboundMessage::status(format!("Reading {path}...")));
                    let content = self.gate.read(&path).await;
                    let content = prefix_by_chars(&content, self.settings.read_char_limit);
                    self.history.append_assistant(format!("{path}:\n{content}"));
                    self.emit(OutboundMessage::response(format!(
                        "**{path}:**\n```\n{content}\n```"
                    )));
                }
                ParsedAction::RunCommand { command } => {
                    let pending = self.gate.request(GatedAction::RunCommand { command });
                    if !lead_run_registered {
                        self.follow_ups.insert(pending.id.clone());
                        lead_run_registered = true;
                    }
                    self.emit(OutboundMessage::Action(ActionPrompt::from(&pending)));
                }
                ParsedAction::WriteFile { path, content } => {
                    let pending = self.gate.request(GatedAction::WriteFile { path, content });
                    self.emit(OutboundMessage::Action(ActionPrompt::from(&pending)));
                }
            }
        }
        if self.gate.has_pending() {
            self.transition(LoopState::AwaitingApproval);
        }
    }

    fn system_prompt(&mut self) -> String {
        let snapshot = self.session.workspace_snapshot(self.inspector.as_ref());
        render_system_prompt(&snapshot)
    }
}
