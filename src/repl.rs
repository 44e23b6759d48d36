//! Interactive-mode helpers: slash commands and the approval queue the
//! terminal surface keeps while the session actor waits on the user.

use crate::runtime::{ActionPrompt, ActionType, InboundMessage};

/// Static slash command metadata used by `/help`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlashCommand {
    pub name: &'static str,
    pub description: &'static str,
}

/// Built-in slash commands for interactive mode.
pub const SLASH_COMMANDS: [SlashCommand; 8] = [
    SlashCommand {
        name: "/approve",
        description: "Approve a pending action: /approve [id] (oldest when omitted).",
    },
    SlashCommand {
        name: "/skip",
        description: "Skip a pending action: /skip [id].",
    },
    SlashCommand {
        name: "/pending",
        description: "List actions awaiting approval.",
    },
    SlashCommand {
        name: "/clear",
        description: "Clear the conversation and pending actions.",
    },
    SlashCommand {
        name: "/login",
        description: "Sign in: /login <email> (password is prompted).",
    },
    SlashCommand {
        name: "/logout",
        description: "Sign out and forget the stored credential.",
    },
    SlashCommand {
        name: "/help",
        description: "List available slash commands.",
    },
    SlashCommand {
        name: "/quit",
        description: "Exit interactive mode.",
    },
];

/// Parsed slash command actions consumed by the main loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommandAction {
    Quit,
    Help,
    Clear,
    Pending,
    Approve(Option<String>),
    Skip(Option<String>),
    Login(Option<String>),
    Logout,
    Unknown(String),
}

/// Parse a slash command from user input.
///
/// Returns `None` if the input is not a slash command.
pub fn parse_slash_command(input: &str) -> Option<SlashCommandAction> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut words = trimmed.split_whitespace();
    let token = words.next().unwrap_or("").to_ascii_lowercase();
    let arg = words.next().map(str::to_string);

    let action = match token.as_str() {
        "/" | "/help" => SlashCommandAction::Help,
        "/quit" | "/exit" | "/q" => SlashCommandAction::Quit,
        "/clear" => SlashCommandAction::Clear,
        "/pending" => SlashCommandAction::Pending,
        "/approve" | "/y" => SlashCommandAction::Approve(arg),
        "/skip" | "/n" => SlashCommandAction::Skip(arg),
        "/login" => SlashCommandAction::Login(arg),
        "/logout" => SlashCommandAction::Logout,
        other => SlashCommandAction::Unknown(other.to_string()),
    };
    Some(action)
}

/// Approval prompts the terminal has shown and not yet resolved.
#[derive(Debug, Default)]
pub struct PendingActions {
    prompts: Vec<ActionPrompt>,
}

impl PendingActions {
    pub fn push(&mut self, prompt: ActionPrompt) {
        self.prompts.push(prompt);
    }

    pub fn clear(&mut self) {
        self.prompts.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionPrompt> {
        self.prompts.iter()
    }

    /// Remove the prompt with `id`, or the oldest one when `id` is `None`.
    pub fn take(&mut self, id: Option<&str>) -> Option<ActionPrompt> {
        let index = match id {
            Some(id) => self.prompts.iter().position(|p| p.id == id)?,
            None if self.prompts.is_empty() => return None,
            None => 0,
        };
        Some(self.prompts.remove(index))
    }
}

/// Inbound message resolving `prompt`.
pub fn resolution_message(prompt: ActionPrompt, approved: bool) -> InboundMessage {
    if !approved {
        return InboundMessage::Skip { id: prompt.id };
    }
    match prompt.action_type {
        ActionType::Run => InboundMessage::ApproveRun {
            command: prompt.command.unwrap_or_default(),
            id: Some(prompt.id),
        },
        ActionType::Write => InboundMessage::ApproveWrite {
            file: prompt.file.unwrap_or_default(),
            content: prompt.content.unwrap_or_default(),
            id: Some(prompt.id),
        },
    }
}

/// `/help` text.
pub fn help_text() -> String {
    SLASH_COMMANDS
        .iter()
        .map(|cmd| format!("  {:<10} {}", cmd.name, cmd.description))
        .collect::<Vec<_>>()
        .join("\n")
}
