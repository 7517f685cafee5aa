//! Validation request coordinator.
//!
//! Turns a stream of [`EditEvent`]s into at most one in-flight
//! validation call and publishes the latest settled result.
//!
//! # Architecture
//!
//! ```text
//! edits ──→ ┌──────────────┐ ──spawn──→ transport task ──→ service
//!           │ driver task  │                 │
//! timer ──→ │ (owns state) │ ←──settlement───┘
//!           └──────────────┘ ──watch──→ renderers
//! ```
//!
//! - `state.rs` - CoordinatorState and its entry points
//! - this module - the single task that owns the state, and its handle

mod state;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::model::{EditEvent, RequestId, ValidationRequest, ValidationResult};
use crate::service::ValidationService;

pub use state::{
    CoordinatorSnapshot, CoordinatorState, EditOutcome, Phase, SettleDecision,
};

/// Outcome delivered by a transport task.
#[derive(Debug)]
struct Settlement {
    request_id: RequestId,
    outcome: ValidationResult,
}

/// Driver that owns [`CoordinatorState`] on a single task.
pub struct Coordinator {
    state: CoordinatorState,
    service: Arc<dyn ValidationService>,
    edits: mpsc::UnboundedReceiver<EditEvent>,
    settlements_tx: mpsc::UnboundedSender<Settlement>,
    settlements_rx: mpsc::UnboundedReceiver<Settlement>,
    snapshots: watch::Sender<CoordinatorSnapshot>,
    shutdown: CancellationToken,
}

impl Coordinator {
    /// Start a coordinator on the current tokio runtime.
    pub fn spawn(service: Arc<dyn ValidationService>, quiet_period: Duration) -> CoordinatorHandle {
        let shutdown = CancellationToken::new();
        let (edit_tx, edit_rx) = mpsc::unbounded_channel();
        let (settlements_tx, settlements_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(CoordinatorSnapshot::default());

        tracing::debug!(
            service = service.name(),
            quiet_period_ms = quiet_period.as_millis() as u64,
            "Starting coordinator"
        );

        let coordinator = Coordinator {
            state: CoordinatorState::with_root(quiet_period, shutdown.clone()),
            service,
            edits: edit_rx,
            settlements_tx,
            settlements_rx,
            snapshots: snapshot_tx,
            shutdown: shutdown.clone(),
        };
        let task = tokio::spawn(coordinator.run());

        CoordinatorHandle {
            edits: edit_tx,
            snapshots: snapshot_rx,
            shutdown,
            task: Some(task),
        }
    }

    async fn run(mut self) {
        loop {
            let deadline = self.state.pending_deadline();

            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break,

                edit = self.edits.recv() => match edit {
                    Some(event) => self.handle_edit(event),
                    None => break,
                },

                Some(settlement) = self.settlements_rx.recv() => {
                    self.handle_settlement(settlement);
                }

                _ = sleep_until_deadline(deadline) => self.handle_trigger(),
            }

            self.publish();
        }

        self.state.dispose();
        self.publish();
        tracing::debug!("Coordinator disposed");
    }

    fn handle_edit(&mut self, event: EditEvent) {
        let now = Instant::now();
        let since_edit = now.saturating_duration_since(event.timestamp);
        match self.state.on_edit(event, now) {
            EditOutcome::Scheduled { .. } => {
                tracing::trace!(since_edit_ms = since_edit.as_millis() as u64, "Trigger rescheduled");
            }
            EditOutcome::Reset => tracing::debug!("Blank input, coordinator reset"),
            EditOutcome::Ignored => {}
        }
    }

    fn handle_trigger(&mut self) {
        if let Some((request, token)) = self.state.fire_due(Instant::now()) {
            self.dispatch(request, token);
        }
    }

    fn handle_settlement(&mut self, settlement: Settlement) {
        let Settlement {
            request_id,
            outcome,
        } = settlement;
        let label = outcome.label();
        let decision = self.state.on_settle(request_id, outcome);
        tracing::debug!(
            request_id,
            outcome = label,
            decision = ?decision,
            "Request settled"
        );
    }

    fn dispatch(&self, request: ValidationRequest, token: CancellationToken) {
        tracing::info!(
            request_id = request.request_id,
            dialect = %request.dialect,
            "Issuing validation request"
        );

        let service = Arc::clone(&self.service);
        let settlements = self.settlements_tx.clone();

        tokio::spawn(async move {
            let request_id = request.request_id;
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => ValidationResult::cancelled(),
                outcome = service.validate(&request) => outcome,
            };
            // The driver may already be gone after disposal.
            let _ = settlements.send(Settlement {
                request_id,
                outcome,
            });
        });
    }

    fn publish(&self) {
        let next = self.state.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Owning handle to a running coordinator.
///
/// Dropping the handle disposes the coordinator: the pending trigger is
/// cleared and the in-flight request is cancelled.
pub struct CoordinatorHandle {
    edits: mpsc::UnboundedSender<EditEvent>,
    snapshots: watch::Receiver<CoordinatorSnapshot>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl CoordinatorHandle {
    /// Feed an edit event. Returns false once the coordinator has stopped.
    pub fn submit(&self, event: EditEvent) -> bool {
        self.edits.send(event).is_ok()
    }

    /// Feed the current text and dialect, stamped now.
    pub fn edit(&self, text: impl Into<String>, dialect: impl Into<String>) -> bool {
        self.submit(EditEvent::now(text, dialect))
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> CoordinatorSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every published change.
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until a snapshot satisfies `predicate`.
    ///
    /// Returns `None` if the coordinator stops first.
    pub async fn wait_for<F>(&self, predicate: F) -> Option<CoordinatorSnapshot>
    where
        F: FnMut(&CoordinatorSnapshot) -> bool,
    {
        let mut rx = self.snapshots.clone();
        let snapshot = rx.wait_for(predicate).await.ok()?.clone();
        Some(snapshot)
    }

    /// Dispose the coordinator and wait for its task to finish.
    pub async fn dispose(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "Coordinator task ended abnormally");
            }
        }
    }
}

impl Drop for CoordinatorHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
