//! Shared test fixtures for gateway/host/loop test modules.
//!
//! Keeping the scripted gateway, recording host, and temp-dir helpers here
//! prevents each test module from rebuilding its own ad-hoc stubs.

use crate::error::{GatewayError, HostError};
use crate::gateway::ModelGateway;
use crate::host::{ExecLimits, ExecOutput, Host};
use crate::session::SessionContext;
use crate::types::ChatRequest;
use crate::workspace::WorkspaceInspector;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{SystemTime, UNIX_EPOCH};

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Temporary directory fixture with best-effort cleanup.
#[derive(Debug)]
pub struct TestTempDir {
    path: PathBuf,
}

impl TestTempDir {
    /// Create a unique temporary directory with a readable prefix.
    pub fn new(prefix: &str) -> Self {
        let suffix = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let dir = std::env::temp_dir().join(format!("ceptra-{prefix}-{millis}-{suffix}"));
        fs::create_dir_all(&dir).expect("failed to create temporary fixture directory");
        Self { path: dir }
    }

    /// Root directory path for this fixture.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Build a child path under the fixture root.
    pub fn child(&self, relative: &str) -> PathBuf {
        self.path.join(relative)
    }

    /// Write UTF-8 text to a child path, creating parent directories as needed.
    pub fn write_text(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.child(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent directories for fixture");
        }
        fs::write(&path, content).expect("failed to write fixture file");
        path
    }
}

impl Drop for TestTempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// One gateway call observed by [`ScriptedGateway`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub request: ChatRequest,
    pub bearer: Option<String>,
}

/// Gateway that replays queued replies and records every request.
pub struct ScriptedGateway {
    replies: StdMutex<VecDeque<Result<String, GatewayError>>>,
    calls: StdMutex<Vec<RecordedCall>>,
}

impl ScriptedGateway {
    pub fn new(replies: Vec<&str>) -> Arc<Self> {
        Self::with_results(replies.into_iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn with_results(replies: Vec<Result<String, GatewayError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: StdMutex::new(replies.into()),
            calls: StdMutex::new(Vec::new()),
        })
    }

    /// Cloned snapshot of every call so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl ModelGateway for Arc<ScriptedGateway> {
    async fn complete(
        &self,
        request: &ChatRequest,
        session: &SessionContext,
    ) -> Result<String, GatewayError> {
        self.calls.lock().expect("calls lock").push(RecordedCall {
            request: request.clone(),
            bearer: session.bearer_token().map(str::to_string),
        });
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::InvalidResponse("no scripted reply".into())))
    }
}

/// In-memory host that records commands and writes.
#[derive(Default)]
pub struct RecordingHost {
    files: StdMutex<HashMap<PathBuf, String>>,
    outputs: StdMutex<VecDeque<ExecOutput>>,
    commands: StdMutex<Vec<(String, PathBuf)>>,
    run_failure: StdMutex<Option<String>>,
    write_failure: StdMutex<Option<String>>,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue the output returned by the next `run_command`.
    pub fn push_output(&self, output: ExecOutput) {
        self.outputs.lock().expect("outputs lock").push_back(output);
    }

    pub fn add_file(&self, path: impl Into<PathBuf>, content: &str) {
        self.files
            .lock()
            .expect("files lock")
            .insert(path.into(), content.to_string());
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files
            .lock()
            .expect("files lock")
            .get(path.as_ref())
            .cloned()
    }

    /// Make the next `run_command` fail to spawn.
    pub fn fail_next_run(&self, message: &str) {
        *self.run_failure.lock().expect("failure lock") = Some(message.to_string());
    }

    /// Make the next `write_file` fail with a permission error.
    pub fn fail_next_write(&self, message: &str) {
        *self.write_failure.lock().expect("failure lock") = Some(message.to_string());
    }

    /// Every `(command, cwd)` run so far.
    pub fn commands(&self) -> Vec<(String, PathBuf)> {
        self.commands.lock().expect("commands lock").clone()
    }
}

#[async_trait]
impl Host for RecordingHost {
    async fn read_file(&self, path: &Path) -> Result<String, HostError> {
        self.file(path).ok_or_else(|| HostError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        })
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<(), HostError> {
        if let Some(message) = self.write_failure.lock().expect("failure lock").take() {
            return Err(HostError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, message),
            });
        }
        self.add_file(path, content);
        Ok(())
    }

    async fn run_command(
        &self,
        command: &str,
        cwd: &Path,
        _limits: ExecLimits,
    ) -> Result<ExecOutput, HostError> {
        self.commands
            .lock()
            .expect("commands lock")
            .push((command.to_string(), cwd.to_path_buf()));
        if let Some(message) = self.run_failure.lock().expect("failure lock").take() {
            return Err(HostError::Spawn(message));
        }
        Ok(self
            .outputs
            .lock()
            .expect("outputs lock")
            .pop_front()
            .unwrap_or_default())
    }
}

/// Inspector returning fixed text and counting snapshot calls.
pub struct StaticInspector {
    text: StdMutex<String>,
    root: Option<PathBuf>,
    digest: String,
    calls: AtomicUsize,
}

impl StaticInspector {
    pub fn new(text: &str) -> Self {
        Self {
            text: StdMutex::new(text.to_string()),
            root: None,
            digest: String::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_digest(mut self, digest: &str) -> Self {
        self.digest = digest.to_string();
        self
    }

    pub fn set(&self, text: &str) {
        *self.text.lock().expect("text lock") = text.to_string();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl WorkspaceInspector for StaticInspector {
    fn snapshot(&self) -> String {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.text.lock().expect("text lock").clone()
    }

    fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    fn source_digest(&self, _budget: usize) -> String {
        self.digest.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_dir_fixture_writes_and_resolves_paths() {
        let fixture = TestTempDir::new("fixture");
        let file = fixture.write_text("nested/file.txt", "hello");
        assert_eq!(fs::read_to_string(file).unwrap(), "hello");
    }

    #[tokio::test]
    async fn scripted_gateway_replays_then_fails() {
        let gateway = ScriptedGateway::new(vec!["one"]);
        let session = SessionContext::start(None);
        let request = ChatRequest::new("m", "s", Vec::new());
        assert_eq!(gateway.complete(&request, &session).await.unwrap(), "one");
        assert!(gateway.complete(&request, &session).await.is_err());
        assert_eq!(gateway.calls().len(), 2);
    }
}
