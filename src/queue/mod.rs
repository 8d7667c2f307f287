//! Serializes command execution against a repository.
//!
//! Git is not safe for concurrent invocation on one working directory, so a
//! single worker task owns the executor and runs at most one command at a
//! time. Mutations execute in strict submission order; read-only requests
//! may be reordered ahead of other reads, coalesced, or cancelled.

use crate::error::{ExecResult, ExecutionError};
use crate::git::command::CommandIntent;
use crate::git::executor::{CommandExecutor, CommandResult};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

/// Hard cap on queued requests; submissions beyond it are rejected.
const MAX_PENDING: usize = 128;

/// Outcome delivered to a submitter.
pub type CommandOutcome = ExecResult<CommandResult>;

/// Scheduling class for a request. Interactive requests are user-initiated
/// and preferred over background refreshes, but never at the cost of
/// reordering mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Interactive,
    Background,
}

/// Identifies a submitted request, for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

/// Handle to an in-queue request.
pub struct Ticket {
    pub id: RequestId,
    rx: oneshot::Receiver<CommandOutcome>,
}

impl Ticket {
    /// Await the command's outcome.
    pub async fn wait(self) -> CommandOutcome {
        self.rx.await.unwrap_or(Err(ExecutionError::QueueClosed))
    }
}

enum Message {
    Submit {
        id: RequestId,
        intent: CommandIntent,
        priority: Priority,
        reply: oneshot::Sender<CommandOutcome>,
    },
    Cancel(RequestId),
}

/// Submission side of the queue. Cloneable; the worker shuts down when all
/// handles are dropped and the backlog is drained.
#[derive(Clone)]
pub struct OperationQueue {
    tx: mpsc::UnboundedSender<Message>,
    next_id: std::sync::Arc<AtomicU64>,
}

impl OperationQueue {
    /// Spawn the worker task that owns the executor.
    pub fn new(executor: CommandExecutor) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(executor, rx));
        OperationQueue {
            tx,
            next_id: std::sync::Arc::new(AtomicU64::new(1)),
        }
    }

    /// Enqueue a command. Never blocks; the returned ticket resolves when
    /// the command finishes (or fails, or is cancelled or rejected).
    pub fn submit(&self, intent: CommandIntent, priority: Priority) -> Ticket {
        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (reply, rx) = oneshot::channel();
        // A closed channel drops `reply`, which resolves the ticket with
        // QueueClosed.
        let _ = self.tx.send(Message::Submit {
            id,
            intent,
            priority,
            reply,
        });
        Ticket { id, rx }
    }

    /// Submit and wait in one step.
    pub async fn execute(&self, intent: CommandIntent, priority: Priority) -> CommandOutcome {
        self.submit(intent, priority).wait().await
    }

    /// Request cancellation of a pending request. Only read-only requests
    /// that have not started are cancelled; everything else is unaffected.
    pub fn cancel(&self, id: RequestId) {
        let _ = self.tx.send(Message::Cancel(id));
    }
}

struct PendingRequest {
    id: RequestId,
    intent: CommandIntent,
    priority: Priority,
    waiters: Vec<oneshot::Sender<CommandOutcome>>,
}

struct Running {
    intent: CommandIntent,
    waiters: Vec<oneshot::Sender<CommandOutcome>>,
    handle: JoinHandle<ExecResult<CommandResult>>,
}

async fn run_worker(executor: CommandExecutor, mut rx: mpsc::UnboundedReceiver<Message>) {
    let mut pending: VecDeque<PendingRequest> = VecDeque::new();
    let mut running: Option<Running> = None;
    let mut channel_open = true;

    loop {
        if running.is_none() {
            if let Some(index) = pick_next(&pending) {
                let request = pending.remove(index).expect("picked index in bounds");
                debug!(op = request.intent.operation_name(), "starting command");
                let args = request.intent.args();
                let exec = executor.clone();
                running = Some(Running {
                    intent: request.intent,
                    waiters: request.waiters,
                    handle: tokio::spawn(async move { exec.run(&args).await }),
                });
            }
        }

        if !channel_open && running.is_none() && pending.is_empty() {
            break;
        }

        let mut finished = false;
        if let Some(active) = running.as_mut() {
            // Disjoint borrows: the join handle is polled while messages may
            // still append waiters to the running command.
            let Running {
                intent,
                waiters,
                handle,
            } = active;
            tokio::select! {
                result = handle => {
                    let outcome = match result {
                        Ok(outcome) => finalize(intent, outcome),
                        Err(_) => Err(ExecutionError::QueueClosed),
                    };
                    for waiter in waiters.drain(..) {
                        let _ = waiter.send(outcome.clone());
                    }
                    finished = true;
                }
                message = rx.recv(), if channel_open => {
                    match message {
                        Some(m) => handle_message(m, &mut pending, Some((&*intent, waiters))),
                        None => channel_open = false,
                    }
                }
            }
        } else {
            match rx.recv().await {
                Some(m) => handle_message(m, &mut pending, None),
                None => channel_open = false,
            }
        }
        if finished {
            running = None;
        }
    }
}

/// Apply per-command exit-code policy: 0 and the intent's benign codes pass
/// through; anything else becomes `NonZeroExit` with stderr verbatim.
fn finalize(intent: &CommandIntent, outcome: ExecResult<CommandResult>) -> CommandOutcome {
    let result = outcome?;
    if result.success() || intent.benign_exit_codes().contains(&result.exit_code) {
        Ok(result)
    } else {
        Err(ExecutionError::NonZeroExit {
            operation: intent.operation_name().to_string(),
            code: result.exit_code,
            stderr: result.stderr.trim().to_string(),
        })
    }
}

fn handle_message(
    message: Message,
    pending: &mut VecDeque<PendingRequest>,
    running: Option<(&CommandIntent, &mut Vec<oneshot::Sender<CommandOutcome>>)>,
) {
    match message {
        Message::Submit {
            id,
            intent,
            priority,
            reply,
        } => {
            if !intent.is_mutating() {
                // Equivalent read already in flight: subscribe to it instead
                // of issuing a duplicate. A read may only join a slot behind
                // the last pending mutation; joining an earlier slot would
                // serve it pre-mutation state.
                let barrier = pending
                    .iter()
                    .rposition(|p| p.intent.is_mutating())
                    .map(|i| i + 1)
                    .unwrap_or(0);
                if barrier == 0 {
                    if let Some((active_intent, active_waiters)) = running {
                        if !active_intent.is_mutating() && *active_intent == intent {
                            active_waiters.push(reply);
                            return;
                        }
                    }
                }
                if let Some(existing) = pending
                    .iter_mut()
                    .skip(barrier)
                    .find(|p| !p.intent.is_mutating() && p.intent == intent)
                {
                    existing.waiters.push(reply);
                    return;
                }
            }

            if pending.len() >= MAX_PENDING {
                let _ = reply.send(Err(ExecutionError::QueueFull));
                return;
            }

            pending.push_back(PendingRequest {
                id,
                intent,
                priority,
                waiters: vec![reply],
            });
        }
        Message::Cancel(id) => {
            let position = pending
                .iter()
                .position(|p| p.id == id && !p.intent.is_mutating());
            if let Some(index) = position {
                let mut request = pending.remove(index).expect("position in bounds");
                debug!(op = request.intent.operation_name(), "cancelled pending read");
                for waiter in request.waiters.drain(..) {
                    let _ = waiter.send(Err(ExecutionError::Cancelled));
                }
            }
        }
    }
}

/// Choose the next request to run.
///
/// The head mutation, if any, blocks everything behind it, so only the run
/// of read-only requests ahead of the first mutation is eligible; within
/// that run, interactive requests win. Mutations therefore execute exactly
/// in submission order, and no read submitted after a mutation can pass it.
fn pick_next(pending: &VecDeque<PendingRequest>) -> Option<usize> {
    if pending.is_empty() {
        return None;
    }

    let first_mutating = pending.iter().position(|p| p.intent.is_mutating());
    if first_mutating == Some(0) {
        return Some(0);
    }

    let limit = first_mutating.unwrap_or(pending.len());
    Some(
        (0..limit)
            .find(|&i| pending[i].priority == Priority::Interactive)
            .unwrap_or(0),
    )
}
