//! Presentation surface protocol.
//!
//! Every message is one JSON object tagged by `type`. Inbound messages come
//! from the surface (webview, terminal, or a `--stdio` client); outbound
//! messages are what the session actor emits while a cycle runs.

use crate::gate::{GatedAction, PendingApproval};
use crate::types::Message;
use serde::{Deserialize, Serialize};

/// Surface-originated requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum InboundMessage {
    #[serde(rename = "send")]
    Send { message: String },
    /// Approve a pending run. Surfaces that do not track ids echo the command.
    #[serde(rename = "approve_run")]
    ApproveRun {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    /// Approve a pending write. The echoed `content` is informational; the
    /// gate writes what the model proposed.
    #[serde(rename = "approve_write")]
    ApproveWrite {
        file: String,
        #[serde(default)]
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    #[serde(rename = "skip")]
    Skip { id: String },
    #[serde(rename = "clearHistory")]
    ClearHistory,
    /// The surface (re)attached and wants the transcript.
    #[serde(rename = "attach")]
    Attach,
    #[serde(rename = "login")]
    Login { email: String, password: String },
    #[serde(rename = "signout")]
    SignOut,
    #[serde(rename = "shutdown")]
    Shutdown,
}

/// Kind of a surfaced approval prompt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Run,
    Write,
}

/// Approval card payload for one pending action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionPrompt {
    #[serde(rename = "actionType")]
    pub action_type: ActionType,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl From<&PendingApproval> for ActionPrompt {
    fn from(pending: &PendingApproval) -> Self {
        match &pending.action {
            GatedAction::RunCommand { command } => Self {
                action_type: ActionType::Run,
                id: pending.id.clone(),
                command: Some(command.clone()),
                file: None,
                content: None,
            },
            GatedAction::WriteFile { path, content } => Self {
                action_type: ActionType::Write,
                id: pending.id.clone(),
                command: None,
                file: Some(path.clone()),
                content: Some(content.clone()),
            },
        }
    }
}

/// Session-originated events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    /// Transient progress line (replaced by the next one).
    #[serde(rename = "thinking")]
    Thinking { content: String },
    #[serde(rename = "status")]
    Status { content: String },
    /// Markdown content for the transcript.
    #[serde(rename = "response")]
    Response { content: String },
    #[serde(rename = "action")]
    Action(ActionPrompt),
    #[serde(rename = "error")]
    Error { content: String },
    #[serde(rename = "restoreHistory")]
    RestoreHistory { messages: Vec<Message> },
    #[serde(rename = "loginError")]
    LoginError { content: String },
    #[serde(rename = "signedIn")]
    SignedIn { email: String },
    #[serde(rename = "signedOut")]
    SignedOut,
    /// The cycle finished; the surface may re-enable input.
    #[serde(rename = "idle")]
    Idle,
}

impl OutboundMessage {
    pub fn thinking(content: impl Into<String>) -> Self {
        Self::Thinking {
            content: content.into(),
        }
    }

    pub fn status(content: impl Into<String>) -> Self {
        Self::Status {
            content: content.into(),
        }
    }

    pub fn response(content: impl Into<String>) -> Self {
        Self::Response {
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::Error {
            content: content.into(),
        }
    }
}
