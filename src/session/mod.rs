//! Per-session identity and workspace context.
//!
//! A [`SessionContext`] is created when the surface attaches and destroyed on
//! sign-out or shutdown. It is passed explicitly to the components that need
//! it; nothing here is process-global.

mod store;

pub use store::SessionStore;

use crate::error::AgentError;
use crate::workspace::WorkspaceInspector;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Bearer token and account email obtained from sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    pub email: String,
}

/// Live state for one attached surface.
#[derive(Debug)]
pub struct SessionContext {
    id: String,
    identity: Option<Credential>,
    workspace_snapshot: Option<String>,
    cycle_in_flight: bool,
}

impl SessionContext {
    /// Begin a session, anonymous when `identity` is `None`.
    pub fn start(identity: Option<Credential>) -> Self {
        let id = generate_session_id();
        debug!(session = %id, signed_in = identity.is_some(), "session started");
        Self {
            id,
            identity,
            workspace_snapshot: None,
            cycle_in_flight: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn identity(&self) -> Option<&Credential> {
        self.identity.as_ref()
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.identity.as_ref().map(|c| c.token.as_str())
    }

    pub fn sign_in(&mut self, credential: Credential) {
        debug!(session = %self.id, "session signed in");
        self.identity = Some(credential);
    }

    /// Tear the session down. Consuming `self` makes reuse impossible.
    pub fn end(self) {
        debug!(session = %self.id, "session ended");
    }

    /// Workspace description, computed once and cached until invalidated.
    pub fn workspace_snapshot(&mut self, inspector: &dyn WorkspaceInspector) -> String {
        self.workspace_snapshot
            .get_or_insert_with(|| inspector.snapshot())
            .clone()
    }

    /// Drop the cached snapshot so the next cycle re-inspects the workspace.
    pub fn invalidate_snapshot(&mut self) {
        self.workspace_snapshot = None;
    }

    pub fn cycle_in_flight(&self) -> bool {
        self.cycle_in_flight
    }

    /// Claim the session's single cycle slot.
    pub(crate) fn begin_cycle(&mut self) -> Result<(), AgentError> {
        if self.cycle_in_flight {
            return Err(AgentError::CycleInFlight);
        }
        self.cycle_in_flight = true;
        Ok(())
    }

    pub(crate) fn end_cycle(&mut self) {
        self.cycle_in_flight = false;
    }
}

/// Generate a unique-ish hex session id (`xxxx-xxxx-xxxx-xxxx`).
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; 8];
    OsRng.fill_bytes(&mut bytes);
    let hex = format!("{:016x}", u64::from_be_bytes(bytes));
    format!(
        "{}-{}-{}-{}",
        &hex[0..4],
        &hex[4..8],
        &hex[8..12],
        &hex[12..16]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::StaticInspector;

    #[test]
    fn generate_session_id_is_hex_groups() {
        let id = generate_session_id();
        let parts = id.split('-').collect::<Vec<_>>();
        assert_eq!(parts.len(), 4);
        assert!(parts.iter().all(|part| part.len() == 4));
        assert!(parts
            .iter()
            .all(|part| part.chars().all(|ch| ch.is_ascii_hexdigit())));
    }

    #[test]
    fn second_cycle_is_rejected_until_first_ends() {
        let mut session = SessionContext::start(None);
        session.begin_cycle().expect("first cycle");
        assert!(matches!(
            session.begin_cycle(),
            Err(AgentError::CycleInFlight)
        ));
        session.end_cycle();
        session.begin_cycle().expect("after end");
    }

    // Verifies the snapshot is computed once until explicitly invalidated.
    #[test]
    fn workspace_snapshot_is_cached() {
        let inspector = StaticInspector::new("ws v1");
        let mut session = SessionContext::start(None);
        assert_eq!(session.workspace_snapshot(&inspector), "ws v1");
        inspector.set("ws v2");
        assert_eq!(session.workspace_snapshot(&inspector), "ws v1");
        session.invalidate_snapshot();
        assert_eq!(session.workspace_snapshot(&inspector), "ws v2");
        assert_eq!(inspector.calls(), 2);
    }

    #[test]
    fn sign_in_sets_bearer_token() {
        let mut session = SessionContext::start(None);
        assert!(session.bearer_token().is_none());
        session.sign_in(Credential {
            token: "tok".into(),
            email: "dev@example.com".into(),
        });
        assert_eq!(session.bearer_token(), Some("tok"));
    }
}
