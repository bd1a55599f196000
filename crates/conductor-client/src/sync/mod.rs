//! Status synchroniser.
//!
//! The synchroniser owns the lifecycle table and is the only path through
//! which records change. Membership is guarded by an outer `RwLock`; each
//! record sits behind its own `Mutex`, so updates to one connector are
//! serialised while different connectors proceed independently. Every
//! mutation ends by recomputing the connector's [`ConnectorStatus`] and
//! comparing it with the last one published: a notification is sent only when
//! the snapshot differs, which makes duplicate events harmless.

mod events;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use conductor_config::Config;
use conductor_protocol::{ConnectorId, ErrorCode, RunningState, StateOverview};
use time::OffsetDateTime;
use tokio::sync::{broadcast, mpsc};

pub use events::{ReconciliationFailure, StatusChange, StatusEvent, StatusEventKind};

use crate::clock::Clock;
use crate::errors::TransitionError;
use crate::lifecycle::{ConnectorFault, ConnectorRecord, ConnectorStatus, Discovery};
use crate::reporter::LifecycleReporter;

const SYNC_TARGET: &str = "conductor_client::sync";

/// Locks a mutex, recovering the data if a previous holder panicked.
///
/// Records validate before they write, so a poisoned guard still holds a
/// consistent value.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Timing knobs used by health derivation and the periodic sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTiming {
    /// Heartbeat age beyond which a running connector is unhealthy.
    pub health_timeout: Duration,
    /// Heartbeat age beyond which a running connector is failed.
    pub heartbeat_expiry: Duration,
    /// How long a desired/observed mismatch may last before it is reported.
    pub reconciliation_grace: Duration,
}

impl SyncTiming {
    /// Extracts the timing knobs from resolved configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            health_timeout: config.health_timeout(),
            heartbeat_expiry: config.heartbeat_expiry(),
            reconciliation_grace: config.reconciliation_grace(),
        }
    }
}

#[derive(Debug)]
struct Entry {
    record: ConnectorRecord,
    published: Option<ConnectorStatus>,
    removed: bool,
}

/// Applies daemon events to the lifecycle table and publishes changes.
pub struct StatusSynchronizer {
    entries: RwLock<HashMap<ConnectorId, Arc<Mutex<Entry>>>>,
    changes: broadcast::Sender<StatusChange>,
    clock: Arc<dyn Clock>,
    reporter: Arc<dyn LifecycleReporter>,
    timing: SyncTiming,
}

impl StatusSynchronizer {
    /// Creates an empty synchroniser.
    ///
    /// `capacity` bounds the notification buffer; slow subscribers observe
    /// a lag error rather than blocking writers.
    #[must_use]
    pub fn new(
        timing: SyncTiming,
        capacity: usize,
        clock: Arc<dyn Clock>,
        reporter: Arc<dyn LifecycleReporter>,
    ) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        Self {
            entries: RwLock::new(HashMap::new()),
            changes,
            clock,
            reporter,
            timing,
        }
    }

    /// Creates a synchroniser from resolved configuration.
    #[must_use]
    pub fn from_config(
        config: &Config,
        clock: Arc<dyn Clock>,
        reporter: Arc<dyn LifecycleReporter>,
    ) -> Self {
        Self::new(
            SyncTiming::from_config(config),
            config.notification_capacity(),
            clock,
            reporter,
        )
    }

    /// Subscribes to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.changes.subscribe()
    }

    /// Applies one event, returning whether a notification was published.
    ///
    /// Rejected events are reported and leave the record untouched.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when the event names an unknown
    /// connector, re-announces a tracked one, or asks for an edge outside the
    /// transition table.
    pub fn apply(&self, event: StatusEvent) -> Result<bool, TransitionError> {
        let now = self.clock.now();
        let StatusEvent { connector_id, kind } = event;
        let result = match kind {
            StatusEventKind::Discovered {
                name,
                state,
                enabled,
                supports_hot_reload,
                process_id,
            } => self.track(
                Discovery {
                    id: connector_id,
                    name,
                    state,
                    enabled,
                    supports_hot_reload,
                    process_id,
                },
                now,
            ),
            StatusEventKind::StateChanged { state, process_id } => {
                self.mutate(&connector_id, now, |record| {
                    if record.state() == state {
                        return Ok(None);
                    }
                    record.transition(state, process_id, now).map(Some)
                })
            }
            StatusEventKind::Failed { code, message } => {
                self.mutate(&connector_id, now, |record| {
                    record
                        .fail(ConnectorFault::new(code, message), now)
                        .map(Some)
                })
            }
            StatusEventKind::Heartbeat { at, data_count } => {
                self.mutate(&connector_id, now, |record| {
                    record.record_heartbeat(at, data_count, now);
                    Ok(None)
                })
            }
            StatusEventKind::Removed => self.remove(&connector_id),
        };
        if let Err(error) = &result {
            self.reporter.transition_rejected(error);
        }
        result
    }

    /// Checks a transition without applying it.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when the connector is unknown or the edge
    /// is not permitted from its current phase.
    pub fn check(&self, id: &ConnectorId, to: RunningState) -> Result<(), TransitionError> {
        let entry = self.entry(id)?;
        let guard = lock(&entry);
        if guard.removed {
            return Err(TransitionError::unknown(id));
        }
        guard.record.check(to)
    }

    /// Records whether the last command for `id` was a manual stop.
    ///
    /// Manually stopped connectors are excluded from reconciliation.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::UnknownConnector`] for untracked ids.
    pub fn set_manually_stopped(
        &self,
        id: &ConnectorId,
        stopped: bool,
    ) -> Result<(), TransitionError> {
        let now = self.clock.now();
        self.mutate(id, now, |record| {
            record.set_manually_stopped(stopped);
            Ok(None)
        })
        .map(|_| ())
    }

    /// Whether `id` is tracked.
    #[must_use]
    pub fn is_tracked(&self, id: &ConnectorId) -> bool {
        read(&self.entries).contains_key(id)
    }

    /// Snapshot of one connector.
    #[must_use]
    pub fn snapshot(&self, id: &ConnectorId) -> Option<ConnectorStatus> {
        let now = self.clock.now();
        let entry = self.entry(id).ok()?;
        let guard = lock(&entry);
        (!guard.removed).then(|| guard.record.status(now, self.timing.health_timeout))
    }

    /// Phase `id` returns to once a stop or restart completes.
    #[must_use]
    pub fn resume_state(&self, id: &ConnectorId) -> Option<RunningState> {
        let entry = self.entry(id).ok()?;
        let guard = lock(&entry);
        (!guard.removed).then(|| guard.record.resume_state())
    }

    /// Snapshots of every tracked connector, ordered by id.
    #[must_use]
    pub fn snapshots(&self) -> Vec<ConnectorStatus> {
        let now = self.clock.now();
        let mut statuses: Vec<_> = self
            .all_entries()
            .iter()
            .filter_map(|entry| {
                let guard = lock(entry);
                (!guard.removed).then(|| guard.record.status(now, self.timing.health_timeout))
            })
            .collect();
        statuses.sort_by(|left, right| left.id.cmp(&right.id));
        statuses
    }

    /// Counts per state and the running ids, computed locally.
    #[must_use]
    pub fn overview(&self) -> StateOverview {
        let mut overview = StateOverview::default();
        for status in self.snapshots() {
            *overview.counts.entry(status.state).or_default() += 1;
            if status.state == RunningState::Running {
                overview.running.push(status.id);
            }
        }
        overview
    }

    /// Fails running connectors whose heartbeat is older than the expiry.
    ///
    /// Every other connector is re-published so health flips caused purely by
    /// the passage of time reach subscribers. Returns the ids that were failed.
    pub fn expire_heartbeats(&self) -> Vec<ConnectorId> {
        let now = self.clock.now();
        let mut expired = Vec::new();
        for entry in self.all_entries() {
            let mut guard = lock(&entry);
            if guard.removed {
                continue;
            }
            let last_sign_of_life = guard.record.last_sign_of_life();
            let stale = guard.record.state() == RunningState::Running
                && now - last_sign_of_life >= self.timing.heartbeat_expiry;
            if stale {
                let fault = ConnectorFault::new(
                    ErrorCode::ConnectorHeartbeatLost,
                    "no heartbeat received within the expiry window",
                );
                match guard.record.fail(fault, now) {
                    Ok(from) => {
                        let id = guard.record.id().clone();
                        self.reporter.heartbeat_expired(&id, last_sign_of_life);
                        self.reporter
                            .transition_applied(&id, from, RunningState::Error);
                        expired.push(id);
                    }
                    Err(error) => self.reporter.transition_rejected(&error),
                }
            }
            self.publish(&mut guard, now);
        }
        expired
    }

    /// Reports connectors that should be running but have not been for
    /// longer than the grace period.
    ///
    /// Connectors whose last command was a manual stop are skipped.
    pub fn reconcile(&self) -> Vec<ReconciliationFailure> {
        let now = self.clock.now();
        let mut failures: Vec<_> = self
            .all_entries()
            .iter()
            .filter_map(|entry| {
                let guard = lock(entry);
                let record = &guard.record;
                if guard.removed || record.manually_stopped() {
                    return None;
                }
                let since = record.diverged_since()?;
                (now - since >= self.timing.reconciliation_grace).then(|| ReconciliationFailure {
                    id: record.id().clone(),
                    desired_since: since,
                    observed: record.state(),
                })
            })
            .collect();
        failures.sort_by(|left, right| left.id.cmp(&right.id));
        for failure in &failures {
            self.reporter.reconciliation_failed(failure);
        }
        failures
    }

    /// Applies events in arrival order until the channel closes.
    pub async fn run(&self, mut events: mpsc::Receiver<StatusEvent>) {
        while let Some(event) = events.recv().await {
            let connector_id = event.connector_id.clone();
            if let Ok(changed) = self.apply(event) {
                tracing::trace!(
                    target: SYNC_TARGET,
                    connector = %connector_id,
                    changed,
                    "applied status event"
                );
            }
        }
        tracing::debug!(target: SYNC_TARGET, "status event channel closed");
    }

    fn track(&self, discovery: Discovery, now: OffsetDateTime) -> Result<bool, TransitionError> {
        let mut entries = write(&self.entries);
        if entries.contains_key(&discovery.id) {
            return Err(TransitionError::DuplicateConnector { id: discovery.id });
        }
        let record = ConnectorRecord::discovered(discovery, now)?;
        let id = record.id().clone();
        let mut entry = Entry {
            record,
            published: None,
            removed: false,
        };
        let changed = self.publish(&mut entry, now);
        entries.insert(id, Arc::new(Mutex::new(entry)));
        Ok(changed)
    }

    fn remove(&self, id: &ConnectorId) -> Result<bool, TransitionError> {
        let mut entries = write(&self.entries);
        let entry = entries
            .get(id)
            .cloned()
            .ok_or_else(|| TransitionError::unknown(id))?;
        let mut guard = lock(&entry);
        if !guard.record.is_removable() {
            return Err(TransitionError::rejected(
                id,
                guard.record.state(),
                RunningState::Uninstalling,
            ));
        }
        guard.removed = true;
        entries.remove(id);
        self.send(StatusChange::Removed(id.clone()));
        Ok(true)
    }

    fn mutate<F>(
        &self,
        id: &ConnectorId,
        now: OffsetDateTime,
        change: F,
    ) -> Result<bool, TransitionError>
    where
        F: FnOnce(&mut ConnectorRecord) -> Result<Option<RunningState>, TransitionError>,
    {
        let entry = self.entry(id)?;
        let mut guard = lock(&entry);
        if guard.removed {
            return Err(TransitionError::unknown(id));
        }
        if let Some(from) = change(&mut guard.record)? {
            self.reporter
                .transition_applied(id, from, guard.record.state());
        }
        Ok(self.publish(&mut guard, now))
    }

    fn publish(&self, entry: &mut Entry, now: OffsetDateTime) -> bool {
        let status = entry.record.status(now, self.timing.health_timeout);
        if entry.published.as_ref() == Some(&status) {
            return false;
        }
        entry.published = Some(status.clone());
        self.send(StatusChange::Updated(status));
        true
    }

    fn send(&self, change: StatusChange) {
        if self.changes.send(change).is_err() {
            tracing::trace!(target: SYNC_TARGET, "no subscribers for status change");
        }
    }

    fn entry(&self, id: &ConnectorId) -> Result<Arc<Mutex<Entry>>, TransitionError> {
        read(&self.entries)
            .get(id)
            .cloned()
            .ok_or_else(|| TransitionError::unknown(id))
    }

    fn all_entries(&self) -> Vec<Arc<Mutex<Entry>>> {
        read(&self.entries).values().cloned().collect()
    }
}
