//! Data model for the chat gateway API.
//!
//! These types serialize directly to the JSON payloads the gateway's
//! `/api/chat` endpoint expects, and double as the transcript shape the
//! surface receives on history restore.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Message roles
// ---------------------------------------------------------------------------

/// Conversation participant role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End-user message.
    User,
    /// Assistant/model message.
    Assistant,
    /// Instruction or context injected by the host, not typed by anyone.
    System,
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A single message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Author role for this conversation turn.
    pub role: Role,
    /// Markdown-ish text content.
    pub content: String,
}

impl Message {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request / Response
// ---------------------------------------------------------------------------

/// Request body for `POST {server}/api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    /// The newest user-side instruction.
    pub message: String,
    /// The gateway only supports buffered completions.
    pub stream: bool,
    /// Rendered system prompt including the workspace snapshot.
    pub system: String,
    /// Prior turns, oldest first.
    pub history: Vec<Message>,
}

impl ChatRequest {
    /// Build a non-streaming request.
    pub fn new(message: impl Into<String>, system: impl Into<String>, history: Vec<Message>) -> Self {
        Self {
            message: message.into(),
            stream: false,
            system: system.into(),
            history,
        }
    }
}

/// Successful response body from the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    /// Upstream provider label, when the gateway reports one.
    #[serde(default)]
    pub provider: Option<String>,
}
