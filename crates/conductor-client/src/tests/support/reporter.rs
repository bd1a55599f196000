//! Test double for [`LifecycleReporter`] that records structured events for
//! assertions.

use std::sync::Mutex;

use conductor_config::Config;
use conductor_protocol::{ConnectorId, CorrelationId, RunningState};
use time::OffsetDateTime;

use crate::bootstrap::BootstrapError;
use crate::errors::TransitionError;
use crate::reporter::LifecycleReporter;
use crate::sync::ReconciliationFailure;

/// Structured lifecycle events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// A connector changed phase.
    TransitionApplied {
        id: ConnectorId,
        from: RunningState,
        to: RunningState,
    },
    /// A lifecycle change was refused.
    TransitionRejected(TransitionError),
    /// A connector overstayed the reconciliation grace period.
    ReconciliationFailed(ReconciliationFailure),
    /// A running connector stopped heartbeating.
    HeartbeatExpired(ConnectorId),
    /// A request timed out.
    RequestTimedOut {
        correlation_id: CorrelationId,
        path: String,
    },
    /// A response matched no pending request.
    ResponseUnmatched(Option<CorrelationId>),
}

/// Records lifecycle events for assertions.
#[derive(Debug, Default)]
pub struct RecordingLifecycleReporter {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingLifecycleReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .clone()
    }

    pub fn record(&self, event: LifecycleEvent) {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .push(event);
    }
}

impl LifecycleReporter for RecordingLifecycleReporter {
    fn bootstrap_starting(&self) {
        self.record(LifecycleEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(LifecycleEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(LifecycleEvent::BootstrapFailed(error.to_string()));
    }

    fn transition_applied(&self, id: &ConnectorId, from: RunningState, to: RunningState) {
        self.record(LifecycleEvent::TransitionApplied {
            id: id.clone(),
            from,
            to,
        });
    }

    fn transition_rejected(&self, error: &TransitionError) {
        self.record(LifecycleEvent::TransitionRejected(error.clone()));
    }

    fn reconciliation_failed(&self, failure: &ReconciliationFailure) {
        self.record(LifecycleEvent::ReconciliationFailed(failure.clone()));
    }

    fn heartbeat_expired(&self, id: &ConnectorId, _last_sign_of_life: OffsetDateTime) {
        self.record(LifecycleEvent::HeartbeatExpired(id.clone()));
    }

    fn request_timed_out(&self, correlation_id: &CorrelationId, path: &str) {
        self.record(LifecycleEvent::RequestTimedOut {
            correlation_id: correlation_id.clone(),
            path: path.to_owned(),
        });
    }

    fn response_unmatched(&self, correlation_id: Option<&CorrelationId>) {
        self.record(LifecycleEvent::ResponseUnmatched(correlation_id.cloned()));
    }
}
