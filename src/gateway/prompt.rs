//! System prompt and follow-up prompt templating.
//!
//! The built-in instructions live in one template file; the workspace
//! snapshot is the only runtime parameter.

use crate::textutil::prefix_by_chars;
use std::collections::BTreeMap;

const SYSTEM_PROMPT_TEMPLATE: &str = include_str!("../templates/system_prompt.template");

/// Characters of command output quoted back to the model after a run.
pub const ANALYSIS_OUTPUT_CHAR_LIMIT: usize = 3000;

/// Instruction sent as `message` for the post-command follow-up call.
pub const ANALYSIS_DIRECTIVE: &str = "Provide a clear analysis. If the task is complete, \
summarize. If more steps are needed, suggest the next action.";

/// Render the system prompt around a workspace snapshot.
pub fn render_system_prompt(workspace_snapshot: &str) -> String {
    let mut vars = BTreeMap::<&str, String>::new();
    vars.insert("WORKSPACE_BLOCK", render_workspace_block(workspace_snapshot));
    normalize_blank_lines(&render_template(SYSTEM_PROMPT_TEMPLATE, &vars))
}

/// Synthetic user turn describing a finished command.
pub fn render_command_report(command: &str, exit_code: i32, output: &str) -> String {
    let output = prefix_by_chars(output, ANALYSIS_OUTPUT_CHAR_LIMIT);
    format!(
        "The command `{command}` just finished with exit code {exit_code}.\nOutput:\n```\n{output}\n```"
    )
}

fn render_workspace_block(snapshot: &str) -> String {
    let snapshot = snapshot.trim();
    if snapshot.is_empty() {
        return String::new();
    }
    format!("Current workspace:\n{snapshot}")
}

fn render_template(template: &str, vars: &BTreeMap<&str, String>) -> String {
    let mut rendered = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("{{{{{key}}}}}");
        rendered = rendered.replace(&placeholder, value);
    }
    rendered
}

/// Collapse runs of blank lines left by empty template blocks.
fn normalize_blank_lines(text: &str) -> String {
    let mut out = String::new();
    let mut previous_blank = false;

    for line in text.lines() {
        let is_blank = line.trim().is_empty();
        if is_blank && previous_blank {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line.trim_end());
        previous_blank = is_blank;
    }

    out.trim().to_string()
}
