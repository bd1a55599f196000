//! BDD world for connector lifecycle scenarios: a client wired to a scripted
//! daemon and a manual clock.

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use conductor_protocol::{ConnectorId, RunningState};
use time::macros::datetime;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::clock::ManualClock;
use crate::errors::OperationFailure;
use crate::facade::ConnectorClient;
use crate::lifecycle::{ConnectorStatus, Discovery};
use crate::router::ResponseRouter;
use crate::sync::{StatusChange, StatusEvent, StatusSynchronizer, SyncTiming};

use super::daemon::ScriptedDaemon;
use super::reporter::RecordingLifecycleReporter;

/// Request timeout used by lifecycle scenarios.
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(50);

/// Scenario world shared across connector lifecycle steps.
pub struct ConnectorWorld {
    runtime: Runtime,
    pub clock: Arc<ManualClock>,
    pub reporter: Arc<RecordingLifecycleReporter>,
    pub daemon: Arc<ScriptedDaemon>,
    pub client: ConnectorClient<Arc<ScriptedDaemon>>,
    changes: broadcast::Receiver<StatusChange>,
    failure: Option<OperationFailure>,
}

impl ConnectorWorld {
    /// Builds a world with an empty model.
    #[must_use]
    pub fn new() -> Self {
        let runtime = Builder::new_current_thread()
            .enable_time()
            .build()
            .expect("tokio runtime");
        let clock = Arc::new(ManualClock::starting_at(datetime!(2026-03-01 12:00 UTC)));
        let reporter = Arc::new(RecordingLifecycleReporter::default());
        let timing = SyncTiming {
            health_timeout: Duration::from_secs(15),
            heartbeat_expiry: Duration::from_secs(45),
            reconciliation_grace: Duration::from_secs(30),
        };
        let synchronizer = Arc::new(StatusSynchronizer::new(
            timing,
            64,
            clock.clone(),
            reporter.clone(),
        ));
        let router = Arc::new(ResponseRouter::new(reporter.clone()));
        let daemon = Arc::new(ScriptedDaemon::new(router.clone()));
        let changes = synchronizer.subscribe();
        let client = ConnectorClient::new(
            daemon.clone(),
            router,
            synchronizer,
            reporter.clone(),
            REQUEST_TIMEOUT,
        );
        Self {
            runtime,
            clock,
            reporter,
            daemon,
            client,
            changes,
            failure: None,
        }
    }

    /// Drives a future on the world's runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Keeps the failure of a façade call for later assertions.
    pub fn record<T>(&mut self, outcome: Result<T, OperationFailure>) -> Option<T> {
        match outcome {
            Ok(value) => {
                self.failure = None;
                Some(value)
            }
            Err(failure) => {
                self.failure = Some(failure);
                None
            }
        }
    }

    /// Starts tracking `id` in `state` without involving the daemon.
    pub fn track(&self, id: &str, state: RunningState, process_id: Option<u32>) {
        let mut discovery = Discovery::available(ConnectorId::new(id), id).in_state(state);
        discovery.enabled = matches!(state, RunningState::Enabled | RunningState::Running);
        discovery.process_id = process_id;
        self.client
            .synchronizer()
            .apply(StatusEvent::discovered(discovery))
            .expect("track connector");
    }

    /// Feeds a daemon status event straight into the synchroniser,
    /// returning whether a notification was published.
    pub fn deliver(&self, event: StatusEvent) -> bool {
        self.client.synchronizer().apply(event).unwrap_or(false)
    }

    /// Current snapshot of `id`.
    #[must_use]
    pub fn status(&self, id: &str) -> ConnectorStatus {
        self.client
            .status(&ConnectorId::new(id))
            .unwrap_or_else(|| panic!("connector {id} is not tracked"))
    }

    /// Failure returned by the last façade call.
    #[must_use]
    pub fn failure(&self) -> &OperationFailure {
        self.failure
            .as_ref()
            .expect("the last operation should have failed")
    }

    /// Whether the last façade call succeeded.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// Takes every change notification published since the last call.
    pub fn drain_changes(&mut self) -> Vec<StatusChange> {
        let mut changes = Vec::new();
        loop {
            match self.changes.try_recv() {
                Ok(change) => changes.push(change),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return changes,
                Err(TryRecvError::Lagged(skipped)) => panic!("lagged by {skipped}"),
            }
        }
    }
}

impl Default for ConnectorWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default connector world fixture.
#[must_use]
pub fn connector_world() -> RefCell<ConnectorWorld> {
    RefCell::new(ConnectorWorld::new())
}
