//! Prompt enrichment for planning requests.
//!
//! Two shapes of user message get source code attached before they reach the
//! model: broad review requests ("review code", "how does ...") receive a
//! digest of the project's sources, and messages naming a single source file
//! ("explain Foo.cls") receive that file's full content. History always keeps
//! the message as typed.

use super::Orchestrator;
use crate::runtime::OutboundMessage;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// Character budget for the project source digest.
const SOURCE_DIGEST_BUDGET: usize = 15_000;

/// Folders tried, in order, for a bare file name in a message.
const MENTION_SEARCH_DIRS: &[&str] = &["force-app/main/default/classes", "force-app/main/default/lwc"];

fn review_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"\b(check code|review code|explain code|understand|analyze|what does|how does|code review|look at code|check repo|check folder|explain class|explain this)\b",
        )
        .expect("static review pattern")
    })
}

fn mention_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(?:explain|check|review|look at|open)\s+(\S+\.(?:cls|js|html|css|trigger|cmp))")
            .expect("static mention pattern")
    })
}

/// True when the message asks about the project's code as a whole.
pub fn is_code_review_request(message: &str) -> bool {
    review_pattern().is_match(&message.to_lowercase())
}

/// File name named after a verb like "explain" or "open", if any.
pub fn mentioned_file(message: &str) -> Option<&str> {
    mention_pattern()
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Paths tried for a mentioned file, most specific first.
fn mention_candidates(file: &str) -> Vec<String> {
    MENTION_SEARCH_DIRS
        .iter()
        .map(|dir| format!("{dir}/{file}"))
        .chain(std::iter::once(file.to_string()))
        .collect()
}

fn with_project_sources(message: &str, sources: &str) -> String {
    format!(
        "The user asked: \"{message}\"\n\n\
         Here is ALL the source code from the project. Analyze it thoroughly:\n\n\
         {sources}\n\n\
         Provide a detailed analysis: what each class/component does, how they relate, \
         patterns used, and any issues."
    )
}

fn with_file_content(message: &str, content: &str) -> String {
    format!(
        "The user asked: \"{message}\"\n\n\
         Here is the complete file content:\n\n\
         {content}\n\n\
         Explain this code in detail - its purpose, how it works, key methods, and any issues."
    )
}

impl Orchestrator {
    /// Build the request text for a planning call. A readable mentioned
    /// file takes precedence over the project digest.
    pub(super) async fn enrich_message(&mut self, message: &str) -> String {
        let mut prompt = message.to_string();

        if is_code_review_request(message) {
            self.emit(OutboundMessage::status("Reading source files..."));
            let sources = self.inspector.source_digest(SOURCE_DIGEST_BUDGET);
            if !sources.is_empty() {
                debug!(chars = sources.chars().count(), "attached project sources");
                prompt = with_project_sources(message, &sources);
            }
        }

        if let Some(file) = mentioned_file(message) {
            self.emit(OutboundMessage::status(format!("Reading {file}...")));
            for candidate in mention_candidates(file) {
                if let Some(content) = self.gate.try_read(&candidate).await {
                    debug!(path = %candidate, "attached mentioned file");
                    prompt = with_file_content(message, &content);
                    break;
                }
            }
        }

        prompt
    }
}
