//! Session actor and surface protocol facade.
//!
//! Protocol types live in `schema`; this module hosts the actor that turns
//! inbound surface messages into orchestrator jobs and forwards outbound
//! events. One actor serves one session. Every job goes through a single
//! FIFO queue drained by the session worker, so messages take effect in the
//! order the surface sent them. At most one cycle is admitted at a time:
//! sends and resolutions arriving while a cycle is active are rejected with
//! an `error` event, never queued.

use crate::agent::Orchestrator;
use crate::auth::Authenticator;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

mod schema;
mod tasks;

pub use schema::*;
use tasks::{spawn_worker, ActiveCycle, ApprovalTarget, CycleDone, CycleJob, SessionJob};

/// Error text emitted when a send or resolution arrives mid-cycle.
pub const CYCLE_BUSY_MESSAGE: &str = "a cycle is already in flight";

/// Handle for sending surface messages to a spawned session actor.
#[derive(Clone)]
pub struct SessionHandle {
    pub commands: mpsc::Sender<InboundMessage>,
}

impl SessionHandle {
    /// Send one inbound message to the actor.
    pub async fn send(&self, message: InboundMessage) -> Result<(), String> {
        self.commands
            .send(message)
            .await
            .map_err(|_| "session channel closed".to_string())
    }
}

/// Outbound event receiver returned by [`spawn_session`].
pub type SessionEventStream = mpsc::UnboundedReceiver<OutboundMessage>;

/// Spawn a session actor around `orchestrator`.
///
/// The orchestrator's event sink is wired to the returned stream. The stream
/// closes after a `shutdown` message has been processed.
pub fn spawn_session(
    mut orchestrator: Orchestrator,
    authenticator: Arc<dyn Authenticator>,
) -> (SessionHandle, SessionEventStream) {
    let (command_tx, mut command_rx) = mpsc::channel::<InboundMessage>(64);
    let (event_tx, event_rx) = mpsc::unbounded_channel::<OutboundMessage>();
    orchestrator.set_event_sink(Some(event_tx.clone()));

    tokio::spawn(async move {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<CycleDone>();
        let (job_tx, job_rx) = mpsc::unbounded_channel::<SessionJob>();
        let mut worker = spawn_worker(orchestrator, job_rx, done_tx);
        let mut worker_running = true;
        let mut logins = JoinSet::new();
        let mut next_cycle_id: u64 = 1;
        let mut active_cycle: Option<ActiveCycle> = None;

        loop {
            tokio::select! {
                message = command_rx.recv() => {
                    let Some(message) = message else {
                        break;
                    };
                    let mut ctx = ActorContext {
                        authenticator: &authenticator,
                        jobs: &job_tx,
                        logins: &mut logins,
                        active_cycle: &mut active_cycle,
                        next_cycle_id: &mut next_cycle_id,
                        event_tx: &event_tx,
                    };
                    if handle_inbound(message, &mut ctx) {
                        break;
                    }
                }
                Some(done) = done_rx.recv() => {
                    if active_cycle.as_ref().is_some_and(|active| active.cycle_id == done.cycle_id) {
                        active_cycle = None;
                    }
                    // The orchestrator already surfaced any failure.
                    if let Err(err) = done.result {
                        debug!(cycle = done.cycle_id, error = %err, "cycle ended with error");
                    }
                    // Idle only after the guard is released, so a surface
                    // reacting to it is never rejected.
                    let _ = event_tx.send(OutboundMessage::Idle);
                }
                Some(joined) = logins.join_next(), if !logins.is_empty() => {
                    if let Err(err) = joined {
                        warn!(error = %err, "sign-in task panicked");
                    }
                }
                joined = &mut worker, if worker_running => {
                    worker_running = false;
                    warn!(error = ?joined.err(), "session worker stopped");
                    let _ = event_tx.send(OutboundMessage::error("internal error; session stopped"));
                    if active_cycle.take().is_some() {
                        let _ = event_tx.send(OutboundMessage::Idle);
                    }
                    break;
                }
            }
        }

        // Pending sign-ins may still enqueue; the worker finishes the queue,
        // then persists and ends the session.
        while logins.join_next().await.is_some() {}
        drop(job_tx);
        if worker_running {
            if let Err(err) = worker.await {
                warn!(error = %err, "session worker failed during shutdown");
            }
        }
        info!("session actor stopped");
    });

    (
        SessionHandle {
            commands: command_tx,
        },
        event_rx,
    )
}

struct ActorContext<'a> {
    authenticator: &'a Arc<dyn Authenticator>,
    jobs: &'a mpsc::UnboundedSender<SessionJob>,
    logins: &'a mut JoinSet<()>,
    active_cycle: &'a mut Option<ActiveCycle>,
    next_cycle_id: &'a mut u64,
    event_tx: &'a mpsc::UnboundedSender<OutboundMessage>,
}

impl ActorContext<'_> {
    /// Admit a cycle unless one is already active.
    fn start_cycle(&mut self, job: CycleJob) {
        if self.active_cycle.is_some() {
            debug!(?job, "rejecting message while a cycle is active");
            let _ = self.event_tx.send(OutboundMessage::error(CYCLE_BUSY_MESSAGE));
            return;
        }
        let cycle_id = *self.next_cycle_id;
        *self.next_cycle_id = self.next_cycle_id.saturating_add(1);
        if self.jobs.send(SessionJob::Cycle { cycle_id, job }).is_err() {
            warn!(cycle = cycle_id, "session worker gone; cycle dropped");
            return;
        }
        *self.active_cycle = Some(ActiveCycle { cycle_id });
    }

    /// Queue a non-cycle edit behind everything already accepted.
    fn enqueue<F>(&mut self, edit: F)
    where
        F: FnOnce(&mut Orchestrator) + Send + 'static,
    {
        if self.jobs.send(SessionJob::Edit(Box::new(edit))).is_err() {
            warn!("session worker gone; edit dropped");
        }
    }
}

/// Dispatch one inbound message. Returns `true` when the actor should stop.
fn handle_inbound(message: InboundMessage, ctx: &mut ActorContext<'_>) -> bool {
    match message {
        InboundMessage::Send { message } => {
            if message.trim().is_empty() {
                return false;
            }
            ctx.start_cycle(CycleJob::Send(message));
        }
        InboundMessage::ApproveRun { command, id } => {
            let target = match id {
                Some(id) => ApprovalTarget::Id(id),
                None => ApprovalTarget::Run(command),
            };
            ctx.start_cycle(CycleJob::Resolve {
                target,
                approved: true,
            });
        }
        InboundMessage::ApproveWrite { file, id, .. } => {
            let target = match id {
                Some(id) => ApprovalTarget::Id(id),
                None => ApprovalTarget::Write(file),
            };
            ctx.start_cycle(CycleJob::Resolve {
                target,
                approved: true,
            });
        }
        InboundMessage::Skip { id } => {
            ctx.start_cycle(CycleJob::Resolve {
                target: ApprovalTarget::Id(id),
                approved: false,
            });
        }
        InboundMessage::ClearHistory => ctx.enqueue(Orchestrator::clear_history),
        InboundMessage::Attach => ctx.enqueue(|orchestrator| orchestrator.restore_history()),
        InboundMessage::SignOut => ctx.enqueue(Orchestrator::sign_out),
        InboundMessage::Login { email, password } => {
            let authenticator = Arc::clone(ctx.authenticator);
            let jobs = ctx.jobs.clone();
            let event_tx = ctx.event_tx.clone();
            ctx.logins.spawn(async move {
                match authenticator.sign_in(&email, &password).await {
                    Ok(credential) => {
                        let edit = move |orchestrator: &mut Orchestrator| {
                            orchestrator.sign_in(credential)
                        };
                        if jobs.send(SessionJob::Edit(Box::new(edit))).is_err() {
                            warn!("session worker gone; sign-in dropped");
                        }
                    }
                    Err(err) => {
                        info!(error = %err, "sign-in failed");
                        let _ = event_tx.send(OutboundMessage::LoginError {
                            content: err.to_string(),
                        });
                    }
                }
            });
        }
        InboundMessage::Shutdown => return true,
    }
    false
}
