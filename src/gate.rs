//! Approval gate for side-effecting actions.
//!
//! Every `RunCommand` and `WriteFile` the model proposes is parked here as a
//! [`PendingApproval`] until the user explicitly approves or skips it. Only
//! an approval reaches the host; a skip drops the action without a trace.
//! Reads bypass the gate entirely.

use crate::error::AgentError;
use crate::host::{ExecLimits, Host};
use crate::textutil::truncate_with_suffix_by_chars;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Default cap on command output surfaced to the user and model.
pub const DEFAULT_OUTPUT_CHAR_LIMIT: usize = 5000;
const OUTPUT_TRUNCATED_SUFFIX: &str = "\n...[output truncated]";

/// A side-effecting action awaiting approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GatedAction {
    RunCommand { command: String },
    WriteFile { path: String, content: String },
}

impl GatedAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::RunCommand { .. } => "run",
            Self::WriteFile { .. } => "write",
        }
    }
}

/// A parked action plus its approval id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingApproval {
    pub id: String,
    pub action: GatedAction,
    pub created_at_ms: u64,
}

/// Outcome of an approved `RunCommand`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub command: String,
    pub exit_code: i32,
    /// Combined stdout and stderr, trimmed and capped.
    pub output: String,
    pub timed_out: bool,
    pub truncated: bool,
}

impl CommandResult {
    /// Markdown summary shown to the user and appended to history.
    pub fn summary(&self) -> String {
        let output = if self.output.is_empty() {
            "(no output)"
        } else {
            self.output.as_str()
        };
        let mut notes = String::new();
        if self.timed_out {
            notes.push_str(" (timed out)");
        }
        if self.truncated {
            notes.push_str(" (output truncated)");
        }
        format!(
            "**Command:** `{}`\n**Exit code:** {}{notes}\n```\n{output}\n```",
            self.command, self.exit_code
        )
    }
}

/// Outcome of an approved `WriteFile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    /// Path as the model wrote it.
    pub path: String,
    /// Path actually written after resolving against the workspace root.
    pub resolved: PathBuf,
    pub error: Option<String>,
}

impl WriteResult {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    pub fn summary(&self) -> String {
        match &self.error {
            None => format!("File written: {}", self.path),
            Some(err) => format!("[Error writing {}: {err}]", self.path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    Command(CommandResult),
    Write(WriteResult),
}

impl ExecutionResult {
    pub fn summary(&self) -> String {
        match self {
            Self::Command(result) => result.summary(),
            Self::Write(result) => result.summary(),
        }
    }
}

/// What happened to a resolved approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Executed(ExecutionResult),
    Skipped(PendingApproval),
}

/// Host limits and path context for executed actions.
#[derive(Debug, Clone)]
pub struct GateSettings {
    /// Commands run here and relative paths resolve against it. Falls back
    /// to the process working directory when unset.
    pub workspace_root: Option<PathBuf>,
    pub limits: ExecLimits,
    pub output_char_limit: usize,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            workspace_root: None,
            limits: ExecLimits::default(),
            output_char_limit: DEFAULT_OUTPUT_CHAR_LIMIT,
        }
    }
}

/// Holds pending approvals and executes them against a [`Host`].
pub struct ExecutionGate {
    host: Arc<dyn Host>,
    settings: GateSettings,
    pending: Vec<PendingApproval>,
    next_approval_nonce: u64,
}

impl ExecutionGate {
    pub fn new(host: Arc<dyn Host>, settings: GateSettings) -> Self {
        Self {
            host,
            settings,
            pending: Vec::new(),
            next_approval_nonce: 1,
        }
    }

    /// Park `action` and return its approval handle.
    pub fn request(&mut self, action: GatedAction) -> PendingApproval {
        let id = format!("appr-{:04x}", self.next_approval_nonce);
        self.next_approval_nonce = self.next_approval_nonce.saturating_add(1);
        let pending = PendingApproval {
            id,
            action,
            created_at_ms: now_unix_millis(),
        };
        debug!(id = %pending.id, kind = pending.action.label(), "action awaiting approval");
        self.pending.push(pending.clone());
        pending
    }

    /// Pending approvals in the order they were requested.
    pub fn pending(&self) -> &[PendingApproval] {
        &self.pending
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&PendingApproval> {
        self.pending.iter().find(|p| p.id == id)
    }

    /// Oldest pending run whose command text matches exactly.
    pub fn find_run(&self, command: &str) -> Option<&PendingApproval> {
        self.pending.iter().find(|p| {
            matches!(&p.action, GatedAction::RunCommand { command: c } if c == command)
        })
    }

    /// Oldest pending write targeting `path`.
    pub fn find_write(&self, path: &str) -> Option<&PendingApproval> {
        self.pending.iter().find(|p| {
            matches!(&p.action, GatedAction::WriteFile { path: target, .. } if target == path)
        })
    }

    /// Remove the approval and execute it when `approved`.
    ///
    /// Resolving the same id twice fails the second time.
    pub async fn resolve(&mut self, id: &str, approved: bool) -> Result<Resolution, AgentError> {
        let index = self
            .pending
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| AgentError::UnknownApproval(id.to_string()))?;
        let pending = self.pending.remove(index);
        if !approved {
            debug!(id, kind = pending.action.label(), "action skipped");
            return Ok(Resolution::Skipped(pending));
        }
        Ok(Resolution::Executed(self.execute(&pending.action).await))
    }

    /// Drop every pending approval; returns how many were dropped.
    pub fn dismiss_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    /// Read a file through the host. Never fails; errors become marker text.
    pub async fn read(&self, path: &str) -> String {
        self.try_read(path)
            .await
            .unwrap_or_else(|| format!("[Error: cannot read {path}]"))
    }

    /// Read a file through the host, or `None` when it cannot be read.
    pub async fn try_read(&self, path: &str) -> Option<String> {
        let resolved = self.resolve_path(path);
        match self.host.read_file(&resolved).await {
            Ok(text) => Some(text),
            Err(err) => {
                debug!(path, error = %err, "read failed");
                None
            }
        }
    }

    async fn execute(&self, action: &GatedAction) -> ExecutionResult {
        match action {
            GatedAction::RunCommand { command } => {
                ExecutionResult::Command(self.run_command(command).await)
            }
            GatedAction::WriteFile { path, content } => {
                let resolved = self.resolve_path(path);
                let error = self
                    .host
                    .write_file(&resolved, content)
                    .await
                    .err()
                    .map(|err| err.to_string());
                info!(path = %resolved.display(), ok = error.is_none(), "file write");
                ExecutionResult::Write(WriteResult {
                    path: path.clone(),
                    resolved,
                    error,
                })
            }
        }
    }

    async fn run_command(&self, command: &str) -> CommandResult {
        let cwd = self.working_dir();
        info!(command, cwd = %cwd.display(), "running approved command");
        let limit = self.settings.output_char_limit;
        match self
            .host
            .run_command(command, &cwd, self.settings.limits)
            .await
        {
            Ok(out) => {
                let combined = format!("{}{}", out.stdout, out.stderr);
                let trimmed = combined.trim();
                let cut = trimmed.chars().count() > limit;
                let output = truncate_with_suffix_by_chars(trimmed, limit, OUTPUT_TRUNCATED_SUFFIX);
                let truncated = out.truncated || cut;
                CommandResult {
                    command: command.to_string(),
                    exit_code: out.exit_code,
                    output,
                    timed_out: out.timed_out,
                    truncated,
                }
            }
            Err(err) => CommandResult {
                command: command.to_string(),
                exit_code: -1,
                output: format!("[host error: {err}]"),
                timed_out: false,
                truncated: false,
            },
        }
    }

    fn working_dir(&self) -> PathBuf {
        match &self.settings.workspace_root {
            Some(root) => root.clone(),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Resolve a model-supplied path against the workspace root.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            return candidate.to_path_buf();
        }
        self.working_dir().join(candidate)
    }
}

fn now_unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
