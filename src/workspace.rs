//! Workspace inspection for the model's system prompt.
//!
//! The snapshot is a short plain-text description of the open project: its
//! name and root, detected project types, the top-level layout, and a preview
//! of the active file. The source digest attaches capped file contents for
//! review requests. Both are best-effort; unreadable entries are skipped
//! rather than reported.

use crate::textutil::prefix_by_chars;
use std::fs;
use std::path::{Path, PathBuf};

/// Snapshot text used when no workspace root is configured.
pub const NO_WORKSPACE: &str = "No workspace open.";

const MAX_LISTED_ENTRIES: usize = 20;
const MAX_LISTED_CLASSES: usize = 30;
const MAX_LISTED_DEPENDENCIES: usize = 15;
const ACTIVE_FILE_PREVIEW_LINES: usize = 50;
const SKIPPED_DIRS: &[&str] = &["node_modules", "target"];

const CLASS_CHAR_LIMIT: usize = 4000;
const LWC_JS_CHAR_LIMIT: usize = 3000;
const LWC_HTML_CHAR_LIMIT: usize = 2000;
const AURA_CHAR_LIMIT: usize = 2000;
const TRIGGER_CHAR_LIMIT: usize = 3000;
const MAX_AURA_COMPONENTS: usize = 5;
const SOURCE_CUT_MARKER: &str = "\n...(truncated)";

/// Source of the workspace description sent with every planning request.
pub trait WorkspaceInspector: Send + Sync {
    fn snapshot(&self) -> String;

    /// Root directory commands run in and relative paths resolve against.
    fn root(&self) -> Option<&Path>;

    /// Project source files as `=== name ===` sections. No file is added once
    /// `budget` characters have been used. Empty when nothing is found.
    fn source_digest(&self, _budget: usize) -> String {
        String::new()
    }
}

/// Inspector that reads project markers from the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct ProjectInspector {
    root: Option<PathBuf>,
    active_file: Option<PathBuf>,
}

impl ProjectInspector {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self {
            root,
            active_file: None,
        }
    }

    /// Track the file currently focused in the editor.
    pub fn with_active_file(mut self, path: Option<PathBuf>) -> Self {
        self.active_file = path;
        self
    }
}

impl WorkspaceInspector for ProjectInspector {
    fn snapshot(&self) -> String {
        let Some(root) = self.root.as_deref() else {
            return NO_WORKSPACE.to_string();
        };
        let mut parts = Vec::new();
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| root.display().to_string());
        parts.push(format!("Workspace: {name}"));
        parts.push(format!("Root path: {}", root.display()));

        describe_sfdx(root, &mut parts);
        describe_node(root, &mut parts);
        if root.join("Cargo.toml").is_file() {
            parts.push("Project type: Rust (Cargo)".to_string());
        }
        if root.join("pyproject.toml").is_file() || root.join("requirements.txt").is_file() {
            parts.push("Project type: Python".to_string());
        }
        describe_layout(root, &mut parts);
        if let Some(active) = self.active_file.as_deref() {
            describe_active_file(root, active, &mut parts);
        }

        parts.join("\n")
    }

    fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    fn source_digest(&self, budget: usize) -> String {
        let Some(root) = self.root.as_deref() else {
            return String::new();
        };
        let mut digest = SourceDigest::new(budget);
        let source = root.join("force-app").join("main").join("default");
        if source.is_dir() {
            collect_sfdx_sources(&source, &mut digest);
        } else {
            collect_plain_sources(&root.join("src"), &mut digest);
        }
        digest.finish()
    }
}

/// Budgeted accumulator of file sections. Once the running total passes the
/// budget no further files are taken.
struct SourceDigest {
    budget: usize,
    used: usize,
    sections: Vec<String>,
}

impl SourceDigest {
    fn new(budget: usize) -> Self {
        Self {
            budget,
            used: 0,
            sections: Vec::new(),
        }
    }

    fn full(&self) -> bool {
        self.used > self.budget
    }

    /// Add `path` capped at `limit` chars. Returns false when the budget is spent.
    fn add(&mut self, label: &str, path: &Path, limit: usize) -> bool {
        if self.full() {
            return false;
        }
        let Ok(text) = fs::read_to_string(path) else {
            return true;
        };
        let body = if text.chars().count() > limit {
            format!("{}{SOURCE_CUT_MARKER}", prefix_by_chars(&text, limit))
        } else {
            text
        };
        self.used += body.chars().count();
        self.sections.push(format!("=== {label} ===\n{body}"));
        true
    }

    fn finish(self) -> String {
        self.sections.join("\n\n")
    }
}

fn collect_sfdx_sources(source: &Path, digest: &mut SourceDigest) {
    let classes = source.join("classes");
    for name in list_names(&classes).iter().filter(|n| n.ends_with(".cls")) {
        if !digest.add(name, &classes.join(name), CLASS_CHAR_LIMIT) {
            return;
        }
    }

    let lwc = source.join("lwc");
    for component in list_names(&lwc) {
        let dir = lwc.join(&component);
        if !dir.is_dir() {
            continue;
        }
        for (ext, limit) in [("js", LWC_JS_CHAR_LIMIT), ("html", LWC_HTML_CHAR_LIMIT)] {
            let file = format!("{component}.{ext}");
            let path = dir.join(&file);
            if path.is_file() && !digest.add(&format!("lwc/{component}/{file}"), &path, limit) {
                return;
            }
        }
    }

    let aura = source.join("aura");
    for component in list_names(&aura).into_iter().take(MAX_AURA_COMPONENTS) {
        let file = format!("{component}Controller.js");
        let path = aura.join(&component).join(&file);
        if path.is_file() && !digest.add(&format!("aura/{component}/{file}"), &path, AURA_CHAR_LIMIT) {
            return;
        }
    }

    let triggers = source.join("triggers");
    for name in list_names(&triggers).iter().filter(|n| n.ends_with(".trigger")) {
        if !digest.add(name, &triggers.join(name), TRIGGER_CHAR_LIMIT) {
            return;
        }
    }
}

/// Non-Salesforce projects: source files directly under `src/`.
fn collect_plain_sources(dir: &Path, digest: &mut SourceDigest) {
    for name in list_names(dir) {
        let path = dir.join(&name);
        if !path.is_file() || language_id(&path) == "plaintext" {
            continue;
        }
        if !digest.add(&format!("src/{name}"), &path, CLASS_CHAR_LIMIT) {
            return;
        }
    }
}

fn describe_sfdx(root: &Path, parts: &mut Vec<String>) {
    let manifest = root.join("sfdx-project.json");
    if !manifest.is_file() {
        return;
    }
    parts.push("Project type: Salesforce DX (SFDX)".to_string());
    if let Some(value) = read_json(&manifest) {
        let dirs = value
            .get("packageDirectories")
            .and_then(|d| d.as_array())
            .map(|dirs| {
                dirs.iter()
                    .filter_map(|d| d.get("path").and_then(|p| p.as_str()))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        if !dirs.is_empty() {
            parts.push(format!("Package dirs: {}", dirs.join(", ")));
        }
    }

    let source = root.join("force-app").join("main").join("default");
    let listings = [
        ("Apex classes", "classes", Some(".cls"), MAX_LISTED_CLASSES),
        ("LWC components", "lwc", None, MAX_LISTED_ENTRIES),
        ("Triggers", "triggers", Some(".trigger"), MAX_LISTED_ENTRIES),
    ];
    for (label, dir, suffix, limit) in listings {
        let names = list_names(&source.join(dir))
            .into_iter()
            .filter(|name| suffix.map_or(true, |s| name.ends_with(s)))
            .take(limit)
            .collect::<Vec<_>>();
        if !names.is_empty() {
            parts.push(format!("{label}: {}", names.join(", ")));
        }
    }
}

fn describe_node(root: &Path, parts: &mut Vec<String>) {
    let manifest = root.join("package.json");
    if !manifest.is_file() {
        return;
    }
    let Some(value) = read_json(&manifest) else {
        return;
    };
    let name = value
        .get("name")
        .and_then(|n| n.as_str())
        .unwrap_or("unnamed");
    parts.push(format!("Node project: {name}"));
    if let Some(scripts) = value.get("scripts").and_then(|s| s.as_object()) {
        let keys = scripts.keys().map(String::as_str).collect::<Vec<_>>();
        parts.push(format!("Scripts: {}", keys.join(", ")));
    }
    if let Some(deps) = value.get("dependencies").and_then(|d| d.as_object()) {
        let keys = deps
            .keys()
            .take(MAX_LISTED_DEPENDENCIES)
            .map(String::as_str)
            .collect::<Vec<_>>();
        parts.push(format!("Dependencies: {}", keys.join(", ")));
    }
}

fn describe_layout(root: &Path, parts: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(root) else {
        return;
    };
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_str()) {
            continue;
        }
        if entry.path().is_dir() {
            dirs.push(name);
        } else {
            files.push(name);
        }
    }
    dirs.sort();
    files.sort();
    if !dirs.is_empty() {
        dirs.truncate(MAX_LISTED_ENTRIES);
        parts.push(format!("Folders: {}", dirs.join(", ")));
    }
    if !files.is_empty() {
        files.truncate(MAX_LISTED_ENTRIES);
        parts.push(format!("Files: {}", files.join(", ")));
    }
}

fn describe_active_file(root: &Path, active: &Path, parts: &mut Vec<String>) {
    let Ok(text) = fs::read_to_string(active) else {
        return;
    };
    let relative = active.strip_prefix(root).unwrap_or(active);
    let line_count = text.lines().count();
    parts.push(format!(
        "Open file: {} ({}, {line_count} lines)",
        relative.display(),
        language_id(active)
    ));
    let preview = text
        .lines()
        .take(ACTIVE_FILE_PREVIEW_LINES)
        .collect::<Vec<_>>()
        .join("\n");
    if !preview.is_empty() {
        parts.push(format!("Current file preview:\n{preview}"));
    }
}

fn language_id(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or_default() {
        "rs" => "rust",
        "ts" | "tsx" => "typescript",
        "js" | "jsx" | "mjs" => "javascript",
        "py" => "python",
        "cls" | "trigger" | "apex" => "apex",
        "json" => "json",
        "toml" => "toml",
        "md" => "markdown",
        "html" => "html",
        "css" => "css",
        "sh" => "shellscript",
        _ => "plaintext",
    }
}

fn list_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names = entries
        .flatten()
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| !name.starts_with('.'))
        .collect::<Vec<_>>();
    names.sort();
    names
}

fn read_json(path: &Path) -> Option<serde_json::Value> {
    let text = fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::TestTempDir;

    #[test]
    fn no_root_reports_no_workspace() {
        let inspector = ProjectInspector::new(None);
        assert_eq!(inspector.snapshot(), NO_WORKSPACE);
        assert!(inspector.root().is_none());
    }

    // Verifies layout listing skips dot-entries and dependency folders.
    #[test]
    fn snapshot_lists_layout_without_hidden_or_vendored_dirs() {
        let tmp = TestTempDir::new("ws-layout");
        tmp.write_text("src/main.rs", "fn main() {}\n");
        tmp.write_text("node_modules/x/index.js", "");
        tmp.write_text(".git/HEAD", "");
        tmp.write_text("README.md", "# hi\n");
        tmp.write_text("Cargo.toml", "[package]\n");

        let snapshot = ProjectInspector::new(Some(tmp.path().to_path_buf())).snapshot();
        assert!(snapshot.contains("Project type: Rust (Cargo)"), "{snapshot}");
        assert!(snapshot.contains("Folders: src"), "{snapshot}");
        assert!(snapshot.contains("Files: Cargo.toml, README.md"), "{snapshot}");
        assert!(!snapshot.contains("node_modules"));
        assert!(!snapshot.contains(".git"));
    }

    #[test]
    fn snapshot_describes_node_manifest() {
        let tmp = TestTempDir::new("ws-node");
        tmp.write_text(
            "package.json",
            r#"{"name":"web","scripts":{"build":"tsc","test":"jest"},"dependencies":{"react":"18"}}"#,
        );
        let snapshot = ProjectInspector::new(Some(tmp.path().to_path_buf())).snapshot();
        assert!(snapshot.contains("Node project: web"));
        assert!(snapshot.contains("Scripts: build, test"));
        assert!(snapshot.contains("Dependencies: react"));
    }

    #[test]
    fn snapshot_describes_sfdx_sources() {
        let tmp = TestTempDir::new("ws-sfdx");
        tmp.write_text(
            "sfdx-project.json",
            r#"{"packageDirectories":[{"path":"force-app"}]}"#,
        );
        tmp.write_text("force-app/main/default/classes/Account.cls", "");
        tmp.write_text("force-app/main/default/classes/Account.cls-meta.xml", "");
        tmp.write_text("force-app/main/default/triggers/OnAccount.trigger", "");
        let snapshot = ProjectInspector::new(Some(tmp.path().to_path_buf())).snapshot();
        assert!(snapshot.contains("Project type: Salesforce DX (SFDX)"));
        assert!(snapshot.contains("Package dirs: force-app"));
        assert!(snapshot.contains("Apex classes: Account.cls\n"), "{snapshot}");
        assert!(snapshot.contains("Triggers: OnAccount.trigger"));
    }

    // Verifies the digest walks classes, components and triggers with
    // per-kind caps and skips metadata files.
    #[test]
    fn source_digest_reads_sfdx_sources_with_caps() {
        let tmp = TestTempDir::new("ws-digest");
        let base = "force-app/main/default";
        tmp.write_text(&format!("{base}/classes/Account.cls"), "public class Account {}");
        tmp.write_text(&format!("{base}/classes/Account.cls-meta.xml"), "<xml/>");
        tmp.write_text(&format!("{base}/classes/Big.cls"), &"b".repeat(CLASS_CHAR_LIMIT + 10));
        tmp.write_text(&format!("{base}/lwc/card/card.js"), "export default class Card {}");
        tmp.write_text(&format!("{base}/lwc/card/card.html"), "<template></template>");
        tmp.write_text(&format!("{base}/aura/panel/panelController.js"), "({ init() {} })");
        tmp.write_text(&format!("{base}/triggers/OnAccount.trigger"), "trigger OnAccount on Account {}");

        let digest = ProjectInspector::new(Some(tmp.path().to_path_buf())).source_digest(15_000);
        assert!(digest.starts_with("=== Account.cls ===\npublic class Account {}\n\n"), "{digest}");
        assert!(!digest.contains("meta.xml"));
        assert!(digest.contains(&format!(
            "=== Big.cls ===\n{}{SOURCE_CUT_MARKER}",
            "b".repeat(CLASS_CHAR_LIMIT)
        )));
        assert!(digest.contains("=== lwc/card/card.js ===\nexport default class Card {}"));
        assert!(digest.contains("=== lwc/card/card.html ===\n<template></template>"));
        assert!(digest.contains("=== aura/panel/panelController.js ==="));
        assert!(digest.ends_with("=== OnAccount.trigger ===\ntrigger OnAccount on Account {}"));
    }

    #[test]
    fn source_digest_stops_once_budget_is_spent() {
        let tmp = TestTempDir::new("ws-budget");
        for name in ["A", "B", "C"] {
            tmp.write_text(
                &format!("force-app/main/default/classes/{name}.cls"),
                &"x".repeat(3000),
            );
        }
        let digest = ProjectInspector::new(Some(tmp.path().to_path_buf())).source_digest(5000);
        assert!(digest.contains("=== A.cls ==="));
        assert!(digest.contains("=== B.cls ==="));
        assert!(!digest.contains("=== C.cls ==="));
    }

    #[test]
    fn source_digest_falls_back_to_src_folder() {
        let tmp = TestTempDir::new("ws-plain");
        tmp.write_text("src/lib.rs", "pub fn answer() -> u32 { 42 }");
        tmp.write_text("src/notes.bin", "opaque");
        let inspector = ProjectInspector::new(Some(tmp.path().to_path_buf()));
        assert_eq!(
            inspector.source_digest(15_000),
            "=== src/lib.rs ===\npub fn answer() -> u32 { 42 }"
        );
        assert!(ProjectInspector::new(None).source_digest(15_000).is_empty());
    }

    #[test]
    fn snapshot_previews_active_file() {
        let tmp = TestTempDir::new("ws-active");
        let body = (0..60).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let active = tmp.write_text("src/app.py", &body);
        let snapshot = ProjectInspector::new(Some(tmp.path().to_path_buf()))
            .with_active_file(Some(active))
            .snapshot();
        assert!(snapshot.contains("Open file: src/app.py (python, 60 lines)"), "{snapshot}");
        assert!(snapshot.contains("line 49"));
        assert!(!snapshot.contains("line 50"));
    }
}
