//! Fenced action-block extraction from model responses.
//!
//! The model proposes side effects by emitting fenced blocks with a reserved
//! info string:
//!
//! - ```` ```run ```` followed by a shell command,
//! - ```` ```read ```` followed by a file path,
//! - ```` ```write:<path> ```` followed by the full new file content.
//!
//! Everything outside those blocks is residual prose. Parsing is best-effort
//! and never fails: malformed blocks are simply not recognized.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::warn;

/// One action extracted from a model response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParsedAction {
    /// Residual prose with every action block removed.
    Text { content: String },
    RunCommand { command: String },
    ReadFile { path: String },
    WriteFile { path: String, content: String },
}

impl ParsedAction {
    /// Whether this action must pass through explicit user approval.
    pub fn requires_approval(&self) -> bool {
        matches!(self, Self::RunCommand { .. } | Self::WriteFile { .. })
    }
}

/// Fence flavor of a recognized block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Run,
    Read,
    Write,
}

/// Byte span of one recognized block inside the response text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    pub kind: BlockKind,
    pub start: usize,
    pub end: usize,
}

/// Two blocks of different kinds whose spans overlap.
///
/// Each kind is scanned independently, so a malformed fence can be claimed by
/// two patterns at once. Both actions are still reported; the surface just
/// gets told the response was ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseAmbiguity {
    pub first: BlockSpan,
    pub second: BlockSpan,
}

/// Full parse result including diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub actions: Vec<ParsedAction>,
    pub ambiguities: Vec<ParseAmbiguity>,
}

fn run_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)```run\n(.*?)```").expect("static run pattern"))
}

fn read_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)```read\n(.*?)```").expect("static read pattern"))
}

fn write_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)```write:([^\n]*)\n(.*?)```").expect("static write pattern")
    })
}

/// Extract the ordered list of actions from one model response.
///
/// When any residual prose survives, it comes first as a single
/// [`ParsedAction::Text`]; the remaining actions follow in the order their
/// blocks appear in `text`.
pub fn parse(text: &str) -> Vec<ParsedAction> {
    let report = parse_report(text);
    for ambiguity in &report.ambiguities {
        warn!(
            first = ?ambiguity.first.kind,
            second = ?ambiguity.second.kind,
            offset = ambiguity.second.start,
            "overlapping action blocks in model response"
        );
    }
    report.actions
}

/// Like [`parse`] but also returns overlap diagnostics instead of logging them.
pub fn parse_report(text: &str) -> ParseReport {
    let mut blocks: Vec<(BlockSpan, ParsedAction)> = Vec::new();

    for caps in run_pattern().captures_iter(text) {
        let whole = &caps[0];
        let start = caps.get(0).map_or(0, |m| m.start());
        blocks.push((
            BlockSpan {
                kind: BlockKind::Run,
                start,
                end: start + whole.len(),
            },
            ParsedAction::RunCommand {
                command: caps[1].trim().to_string(),
            },
        ));
    }

    for caps in read_pattern().captures_iter(text) {
        let whole = &caps[0];
        let start = caps.get(0).map_or(0, |m| m.start());
        blocks.push((
            BlockSpan {
                kind: BlockKind::Read,
                start,
                end: start + whole.len(),
            },
            ParsedAction::ReadFile {
                path: caps[1].trim().to_string(),
            },
        ));
    }

    for caps in write_pattern().captures_iter(text) {
        let whole = &caps[0];
        let start = caps.get(0).map_or(0, |m| m.start());
        blocks.push((
            BlockSpan {
                kind: BlockKind::Write,
                start,
                end: start + whole.len(),
            },
            // File content is kept byte-for-byte; only the path is trimmed.
            ParsedAction::WriteFile {
                path: caps[1].trim().to_string(),
                content: caps[2].to_string(),
            },
        ));
    }

    // Fence prefixes differ per kind, so no two blocks share a start offset
    // and the stable sort is a total order.
    blocks.sort_by_key(|(span, _)| span.start);

    let ambiguities = find_overlaps(blocks.iter().map(|(span, _)| *span));

    let mut actions = Vec::with_capacity(blocks.len() + 1);
    let residual = residual_text(text);
    if !residual.is_empty() {
        actions.push(ParsedAction::Text { content: residual });
    }
    actions.extend(blocks.into_iter().map(|(_, action)| action));

    ParseReport {
        actions,
        ambiguities,
    }
}

/// Remove run, then read, then write blocks and trim what is left.
///
/// Removal is sequential, so an overlapped block that no longer matches after
/// an earlier pass leaves its text in the residual.
fn residual_text(text: &str) -> String {
    let without_run = run_pattern().replace_all(text, "");
    let without_read = read_pattern().replace_all(&without_run, "");
    let without_write = write_pattern().replace_all(&without_read, "");
    without_write.trim().to_string()
}

fn find_overlaps(spans: impl Iterator<Item = BlockSpan>) -> Vec<ParseAmbiguity> {
    let mut out = Vec::new();
    let mut furthest: Option<BlockSpan> = None;
    for span in spans {
        if let Some(previous) = furthest {
            if span.start < previous.end {
                out.push(ParseAmbiguity {
                    first: previous,
                    second: span,
                });
            }
        }
        if furthest.map_or(true, |previous| span.end > previous.end) {
            furthest = Some(span);
        }
    }
    out
}
