//! Structured reporting for client lifecycle events.

use std::sync::Arc;

use conductor_config::Config;
use conductor_protocol::{ConnectorId, CorrelationId, RunningState};
use time::OffsetDateTime;

use crate::bootstrap::BootstrapError;
use crate::errors::TransitionError;
use crate::sync::ReconciliationFailure;

const HEALTH_TARGET: &str = "conductor_client::health";
const LIFECYCLE_TARGET: &str = "conductor_client::lifecycle";
const FACADE_TARGET: &str = "conductor_client::facade";

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait LifecycleReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked after a connector changed phase.
    fn transition_applied(&self, id: &ConnectorId, from: RunningState, to: RunningState);

    /// Invoked when a lifecycle change was refused.
    fn transition_rejected(&self, error: &TransitionError);

    /// Invoked for each connector that should be running but is not.
    fn reconciliation_failed(&self, failure: &ReconciliationFailure);

    /// Invoked when a running connector stopped heartbeating.
    fn heartbeat_expired(&self, id: &ConnectorId, last_sign_of_life: OffsetDateTime);

    /// Invoked when a request received no response in time.
    fn request_timed_out(&self, correlation_id: &CorrelationId, path: &str);

    /// Invoked when a response matched no pending request.
    fn response_unmatched(&self, correlation_id: Option<&CorrelationId>);
}

impl<T> LifecycleReporter for Arc<T>
where
    T: LifecycleReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn transition_applied(&self, id: &ConnectorId, from: RunningState, to: RunningState) {
        (**self).transition_applied(id, from, to);
    }

    fn transition_rejected(&self, error: &TransitionError) {
        (**self).transition_rejected(error);
    }

    fn reconciliation_failed(&self, failure: &ReconciliationFailure) {
        (**self).reconciliation_failed(failure);
    }

    fn heartbeat_expired(&self, id: &ConnectorId, last_sign_of_life: OffsetDateTime) {
        (**self).heartbeat_expired(id, last_sign_of_life);
    }

    fn request_timed_out(&self, correlation_id: &CorrelationId, path: &str) {
        (**self).request_timed_out(correlation_id, path);
    }

    fn response_unmatched(&self, correlation_id: Option<&CorrelationId>) {
        (**self).response_unmatched(correlation_id);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredLifecycleReporter;

impl StructuredLifecycleReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl LifecycleReporter for StructuredLifecycleReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting client bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            request_timeout_ms = config.request_timeout_ms,
            "client bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "client bootstrap failed"
        );
    }

    fn transition_applied(&self, id: &ConnectorId, from: RunningState, to: RunningState) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "transition_applied",
            connector = %id,
            from = %from,
            to = %to,
            "connector changed state"
        );
    }

    fn transition_rejected(&self, error: &TransitionError) {
        tracing::warn!(
            target: LIFECYCLE_TARGET,
            event = "transition_rejected",
            connector = %error.connector_id(),
            error = %error,
            "connector state change rejected"
        );
    }

    fn reconciliation_failed(&self, failure: &ReconciliationFailure) {
        tracing::warn!(
            target: LIFECYCLE_TARGET,
            event = "reconciliation_failed",
            connector = %failure.id,
            observed = %failure.observed,
            desired_since = %failure.desired_since,
            "connector should be running but is not"
        );
    }

    fn heartbeat_expired(&self, id: &ConnectorId, last_sign_of_life: OffsetDateTime) {
        tracing::warn!(
            target: LIFECYCLE_TARGET,
            event = "heartbeat_expired",
            connector = %id,
            last_sign_of_life = %last_sign_of_life,
            "connector heartbeat lost"
        );
    }

    fn request_timed_out(&self, correlation_id: &CorrelationId, path: &str) {
        tracing::warn!(
            target: FACADE_TARGET,
            event = "request_timed_out",
            correlation_id = %correlation_id,
            path,
            "no response before the request timeout"
        );
    }

    fn response_unmatched(&self, correlation_id: Option<&CorrelationId>) {
        tracing::debug!(
            target: FACADE_TARGET,
            event = "response_unmatched",
            correlation_id = ?correlation_id.map(CorrelationId::as_str),
            "dropping response with no pending request"
        );
    }
}
