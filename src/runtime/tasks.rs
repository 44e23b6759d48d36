//! Session worker and cycle bookkeeping.
//!
//! The worker task owns the orchestrator and drains one FIFO job queue, so
//! surface messages mutate the session in the order they arrived while the
//! actor loop keeps reading inbound messages.

use crate::agent::Orchestrator;
use crate::error::AgentError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Actor-owned marker for the cycle currently holding the session.
pub(super) struct ActiveCycle {
    pub(super) cycle_id: u64,
}

/// Completion notification sent from the worker back to the actor.
pub(super) struct CycleDone {
    pub(super) cycle_id: u64,
    pub(super) result: Result<(), AgentError>,
}

/// Which pending action a resolution refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum ApprovalTarget {
    Id(String),
    /// Oldest pending run with this command text.
    Run(String),
    /// Oldest pending write to this path.
    Write(String),
}

/// Work a cycle performs on the orchestrator.
#[derive(Debug)]
pub(super) enum CycleJob {
    Send(String),
    Resolve {
        target: ApprovalTarget,
        approved: bool,
    },
}

/// Short non-cycle mutation (clear, attach, sign-in/out).
pub(super) type SessionEdit = Box<dyn FnOnce(&mut Orchestrator) + Send>;

/// One queued unit of work for the worker.
pub(super) enum SessionJob {
    Cycle { cycle_id: u64, job: CycleJob },
    Edit(SessionEdit),
}

/// Spawn the worker owning `orchestrator`. It runs jobs strictly in queue
/// order and shuts the orchestrator down once every sender is gone.
pub(super) fn spawn_worker(
    mut orchestrator: Orchestrator,
    mut jobs: mpsc::UnboundedReceiver<SessionJob>,
    done_tx: mpsc::UnboundedSender<CycleDone>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(job) = jobs.recv().await {
            match job {
                SessionJob::Cycle { cycle_id, job } => {
                    let result = run_cycle(&mut orchestrator, job).await;
                    let _ = done_tx.send(CycleDone { cycle_id, result });
                }
                SessionJob::Edit(edit) => edit(&mut orchestrator),
            }
        }
        debug!("session queue closed");
        orchestrator.shutdown();
    })
}

async fn run_cycle(orchestrator: &mut Orchestrator, job: CycleJob) -> Result<(), AgentError> {
    match job {
        CycleJob::Send(message) => orchestrator.send(&message).await,
        CycleJob::Resolve { target, approved } => {
            let id = approval_id(orchestrator, target);
            orchestrator.resolve(&id, approved).await
        }
    }
}

/// Map a target to an approval id. Unmatched text is passed through so the
/// orchestrator reports it as an unknown approval.
fn approval_id(orchestrator: &Orchestrator, target: ApprovalTarget) -> String {
    match target {
        ApprovalTarget::Id(id) => id,
        ApprovalTarget::Run(command) => orchestrator
            .find_pending_run(&command)
            .unwrap_or(command),
        ApprovalTarget::Write(path) => orchestrator.find_pending_write(&path).unwrap_or(path),
    }
}
