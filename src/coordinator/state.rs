//! Coordinator state and its entry points.
//!
//! Every mutation goes through one of the methods below. The async
//! runtime in [`super::Coordinator`] calls them from a single task, so
//! the state itself needs no synchronization.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::model::{EditEvent, RequestId, ValidationRequest, ValidationResult};

/// Lifecycle phase derived from the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// A trigger is scheduled and waiting for the quiet period to elapse.
    Debouncing,
    /// A request is in flight and no trigger is pending.
    Requesting,
    Disposed,
}

/// What [`CoordinatorState::on_edit`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// A trigger is now scheduled for `deadline`.
    Scheduled { deadline: Instant },
    /// Blank text cleared the pending trigger, in-flight request and result.
    Reset,
    /// The coordinator is disposed.
    Ignored,
}

/// What [`CoordinatorState::on_settle`] did with a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleDecision {
    /// Older than the active request.
    Stale,
    /// Not the active request (newer id, or no request active anymore).
    Superseded,
    /// Active request settled. `updated` is false for a cancellation,
    /// which clears loading but keeps the previous result.
    Accepted { updated: bool },
}

/// Read-only projection published to renderers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoordinatorSnapshot {
    pub phase: Phase,
    pub is_loading: bool,
    pub last_result: Option<ValidationResult>,
    pub latest_completed_id: RequestId,
}

#[derive(Debug)]
struct PendingTrigger {
    deadline: Instant,
    text: String,
    dialect: String,
}

#[derive(Debug)]
struct InFlight {
    request_id: RequestId,
    cancel: CancellationToken,
}

/// State owned by one coordinator instance.
#[derive(Debug)]
pub struct CoordinatorState {
    quiet_period: Duration,
    pending: Option<PendingTrigger>,
    in_flight: Option<InFlight>,
    next_request_id: RequestId,
    active_request_id: Option<RequestId>,
    latest_completed_id: RequestId,
    last_result: Option<ValidationResult>,
    is_loading: bool,
    disposed: bool,
    /// Parent of every transport token, so disposal reaches all of them.
    root: CancellationToken,
}

impl CoordinatorState {
    pub fn new(quiet_period: Duration) -> Self {
        Self::with_root(quiet_period, CancellationToken::new())
    }

    /// Create state whose transport tokens are children of `root`.
    pub fn with_root(quiet_period: Duration, root: CancellationToken) -> Self {
        Self {
            quiet_period,
            pending: None,
            in_flight: None,
            next_request_id: 1,
            active_request_id: None,
            latest_completed_id: 0,
            last_result: None,
            is_loading: false,
            disposed: false,
            root,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn last_result(&self) -> Option<&ValidationResult> {
        self.last_result.as_ref()
    }

    pub fn active_request_id(&self) -> Option<RequestId> {
        self.active_request_id
    }

    pub fn latest_completed_id(&self) -> RequestId {
        self.latest_completed_id
    }

    /// Deadline of the scheduled trigger, if any.
    pub fn pending_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn phase(&self) -> Phase {
        if self.disposed {
            Phase::Disposed
        } else if self.pending.is_some() {
            Phase::Debouncing
        } else if self.is_loading {
            Phase::Requesting
        } else {
            Phase::Idle
        }
    }

    pub fn snapshot(&self) -> CoordinatorSnapshot {
        CoordinatorSnapshot {
            phase: self.phase(),
            is_loading: self.is_loading,
            last_result: self.last_result.clone(),
            latest_completed_id: self.latest_completed_id,
        }
    }

    /// Debounce gate. The quiet period is measured from `now`.
    pub fn on_edit(&mut self, event: EditEvent, now: Instant) -> EditOutcome {
        if self.disposed {
            return EditOutcome::Ignored;
        }

        if event.is_blank() {
            self.pending = None;
            self.cancel_in_flight();
            self.active_request_id = None;
            self.is_loading = false;
            self.last_result = None;
            return EditOutcome::Reset;
        }

        // Replacing the Option drops the previous trigger.
        let deadline = now + self.quiet_period;
        self.pending = Some(PendingTrigger {
            deadline,
            text: event.text,
            dialect: event.dialect,
        });
        EditOutcome::Scheduled { deadline }
    }

    /// Fire the pending trigger if its deadline has passed, issuing a request.
    ///
    /// Returns the request and the token to hand to the transport.
    pub fn fire_due(&mut self, now: Instant) -> Option<(ValidationRequest, CancellationToken)> {
        if self.disposed {
            return None;
        }
        let due = self.pending.as_ref().is_some_and(|p| p.deadline <= now);
        if !due {
            return None;
        }
        let trigger = self.pending.take()?;
        Some(self.issue(trigger.text, trigger.dialect))
    }

    /// Request issuer. Cancels the previous in-flight request before
    /// making the new one active.
    pub fn issue(&mut self, text: String, dialect: String) -> (ValidationRequest, CancellationToken) {
        self.cancel_in_flight();

        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.active_request_id = Some(request_id);
        self.is_loading = true;

        let cancel = self.root.child_token();
        self.in_flight = Some(InFlight {
            request_id,
            cancel: cancel.clone(),
        });

        let request = ValidationRequest {
            text,
            dialect,
            request_id,
        };
        (request, cancel)
    }

    /// Settlement handler. Only the active request may touch the result.
    pub fn on_settle(&mut self, request_id: RequestId, outcome: ValidationResult) -> SettleDecision {
        let Some(active) = self.active_request_id else {
            return SettleDecision::Superseded;
        };
        if request_id < active {
            return SettleDecision::Stale;
        }
        if request_id != active || self.disposed {
            return SettleDecision::Superseded;
        }

        self.is_loading = false;
        if self
            .in_flight
            .as_ref()
            .is_some_and(|f| f.request_id == request_id)
        {
            self.in_flight = None;
        }

        if outcome.is_cancelled() || request_id <= self.latest_completed_id {
            return SettleDecision::Accepted { updated: false };
        }

        self.last_result = Some(outcome);
        self.latest_completed_id = request_id;
        SettleDecision::Accepted { updated: true }
    }

    /// Tear down: clear the timer and cancel every transport.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.pending = None;
        self.cancel_in_flight();
        self.root.cancel();
        self.is_loading = false;
        self.disposed = true;
    }

    fn cancel_in_flight(&mut self) {
        if let Some(previous) = self.in_flight.take() {
            tracing::debug!(request_id = previous.request_id, "Cancelling in-flight request");
            previous.cancel.cancel();
        }
    }
}
