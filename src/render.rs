//! Terminal rendering for the interactive surface.
//!
//! Assistant content goes to stdout as markdown laid out by `termimad`;
//! progress, approvals, and errors go to stderr so piping stdout captures
//! only the conversation.

use crate::runtime::{ActionPrompt, ActionType, OutboundMessage};
use crate::types::{Message, Role};
use crossterm::style::{Color, Stylize};
use termimad::MadSkin;

const LABEL_ERROR: &str = "error:";
const LABEL_WARNING: &str = "warning:";
const LABEL_ASSISTANT: &str = "ceptra";
const PROMPT_SYMBOL: &str = "›";
const PROMPT_PLAIN: &str = "> ";
const APPROVAL_PREVIEW_LINES: usize = 12;

/// Handles all terminal output formatting.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    /// Whether ANSI color/style output is enabled.
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Print the user input prompt indicator (to stderr).
    pub fn prompt(&self) {
        if self.color {
            eprint!("{} ", PROMPT_SYMBOL.with(Color::Cyan).bold());
        } else {
            eprint!("{PROMPT_PLAIN}");
        }
    }

    pub fn banner(&self, metadata: &str, workspace: &str) {
        if self.color {
            eprintln!(
                "{} {}",
                LABEL_ASSISTANT.with(Color::Cyan).bold(),
                metadata.with(Color::DarkGrey)
            );
            eprintln!("{}", workspace.with(Color::DarkGrey));
        } else {
            eprintln!("{LABEL_ASSISTANT} {metadata}");
            eprintln!("{workspace}");
        }
        eprintln!("Type /help for commands.");
    }

    /// Print assistant markdown to stdout.
    pub fn response(&self, content: &str) {
        println!("{}", render_markdown_for_terminal(content));
        println!();
    }

    /// Transient progress line (to stderr).
    pub fn thinking(&self, text: &str) {
        if self.color {
            eprintln!("{}", text.with(Color::DarkGrey).italic());
        } else {
            eprintln!("{text}");
        }
    }

    pub fn status(&self, text: &str) {
        if self.color {
            eprintln!("{} {}", "•".with(Color::Blue), text.with(Color::Blue));
        } else {
            eprintln!("* {text}");
        }
    }

    pub fn warn(&self, msg: &str) {
        if self.color {
            eprintln!("{} {msg}", LABEL_WARNING.with(Color::Yellow).bold());
        } else {
            eprintln!("{LABEL_WARNING} {msg}");
        }
    }

    pub fn error(&self, msg: &str) {
        if self.color {
            eprintln!("{} {msg}", LABEL_ERROR.with(Color::Red).bold());
        } else {
            eprintln!("{LABEL_ERROR} {msg}");
        }
    }

    /// Print an approval card with the commands to resolve it.
    pub fn approval(&self, prompt: &ActionPrompt) {
        let (title, body) = approval_text(prompt);
        if self.color {
            eprintln!("{} {}", "?".with(Color::Yellow).bold(), title.bold());
            for line in body.lines() {
                eprintln!("  {}", line.with(Color::Yellow));
            }
            eprintln!(
                "  {}",
                format!("/approve {id}   /skip {id}", id = prompt.id).with(Color::DarkGrey)
            );
        } else {
            eprintln!("? {title}");
            for line in body.lines() {
                eprintln!("  {line}");
            }
            eprintln!("  /approve {id}   /skip {id}", id = prompt.id);
        }
    }

    /// Replay a restored transcript.
    pub fn transcript(&self, messages: &[Message]) {
        for message in messages {
            match message.role {
                Role::User => {
                    if self.color {
                        eprintln!("{} {}", PROMPT_SYMBOL.with(Color::Cyan), message.content);
                    } else {
                        eprintln!("{PROMPT_PLAIN}{}", message.content);
                    }
                }
                Role::Assistant => self.response(&message.content),
                Role::System => self.status(&message.content),
            }
        }
    }

    /// Render one outbound event. Returns `true` for `idle`.
    pub fn event(&self, event: &OutboundMessage) -> bool {
        match event {
            OutboundMessage::Thinking { content } => self.thinking(content),
            OutboundMessage::Status { content } => self.status(content),
            OutboundMessage::Response { content } => self.response(content),
            OutboundMessage::Action(prompt) => self.approval(prompt),
            OutboundMessage::Error { content } => self.error(content),
            OutboundMessage::RestoreHistory { messages } => self.transcript(messages),
            OutboundMessage::LoginError { content } => {
                self.error(&format!("sign-in failed: {content}"))
            }
            OutboundMessage::SignedIn { email } => self.status(&format!("Signed in as {email}")),
            OutboundMessage::SignedOut => self.status("Signed out"),
            OutboundMessage::Idle => return true,
        }
        false
    }
}

/// Title and body lines for an approval card.
fn approval_text(prompt: &ActionPrompt) -> (String, String) {
    match prompt.action_type {
        ActionType::Run => (
            format!("Run command [{}]", prompt.id),
            prompt.command.clone().unwrap_or_default(),
        ),
        ActionType::Write => {
            let content = prompt.content.as_deref().unwrap_or_default();
            let mut preview: Vec<String> = content
                .lines()
                .take(APPROVAL_PREVIEW_LINES)
                .map(str::to_string)
                .collect();
            let remaining = content.lines().count().saturating_sub(preview.len());
            if remaining > 0 {
                preview.push(format!("... {remaining} more lines"));
            }
            (
                format!(
                    "Write file {} [{}]",
                    prompt.file.as_deref().unwrap_or_default(),
                    prompt.id
                ),
                preview.join("\n"),
            )
        }
    }
}

/// Render markdown into plain terminal text with structure preserved.
pub fn render_markdown_for_terminal(input: &str) -> String {
    let skin = MadSkin::no_style();
    let formatted = skin.text(input, None).to_string();
    formatted.trim_end_matches('\n').to_string()
}
