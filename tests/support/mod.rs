//! Fixtures shared by the orchestration integration tests.
//!
//! The gateway is scripted; the host is the real `LocalHost` running `sh`
//! inside a throwaway workspace directory.

use async_trait::async_trait;
use ceptra::config::Config;
use ceptra::error::GatewayError;
use ceptra::gateway::ModelGateway;
use ceptra::session::SessionContext;
use ceptra::types::ChatRequest;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Notify;

static WORKSPACE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Throwaway workspace directory removed on drop.
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn create(prefix: &str) -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let n = WORKSPACE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let root = std::env::temp_dir().join(format!(
            "ceptra-it-{prefix}-{}-{millis}-{n}",
            std::process::id()
        ));
        fs::create_dir_all(&root).expect("create workspace");
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, content).expect("write fixture");
    }

    pub fn read(&self, relative: &str) -> Option<String> {
        fs::read_to_string(self.root.join(relative)).ok()
    }

    /// Built-in defaults rooted at this workspace, persistence off.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.workspace.root = Some(self.root.clone());
        config.history.persist = false;
        config
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

/// Gateway replaying canned replies. When `hold` is set, each call waits on
/// it before answering.
pub struct ScriptedGateway {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<ChatRequest>>,
    hold: Option<Arc<Notify>>,
}

impl ScriptedGateway {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            requests: Mutex::new(Vec::new()),
            hold: None,
        })
    }

    pub fn held(replies: &[&str], hold: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            requests: Mutex::new(Vec::new()),
            hold: Some(hold),
        })
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn complete(
        &self,
        request: &ChatRequest,
        _session: &SessionContext,
    ) -> Result<String, GatewayError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .ok_or_else(|| GatewayError::InvalidResponse("script exhausted".into()))
    }
}

/// Shared handle to a `ScriptedGateway`, so tests can keep inspecting it
/// after handing it to the orchestrator.
pub struct SharedGateway(pub Arc<ScriptedGateway>);

#[async_trait]
impl ModelGateway for SharedGateway {
    async fn complete(
        &self,
        request: &ChatRequest,
        session: &SessionContext,
    ) -> Result<String, GatewayError> {
        self.0.complete(request, session).await
    }
}
