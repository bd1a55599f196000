//! Mutable per-connector record and its transition rules.

use std::time::Duration;

use conductor_protocol::{ConnectorId, ErrorCode, RunningState};
use time::OffsetDateTime;

use super::status::{ConnectorFault, ConnectorStatus};
use crate::errors::TransitionError;

/// Facts known about a connector when it is first tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    /// Stable identifier.
    pub id: ConnectorId,
    /// Display name.
    pub name: String,
    /// Phase observed at discovery time.
    pub state: RunningState,
    /// Declared-enabled flag observed at discovery time.
    pub enabled: bool,
    /// Whether configuration can be reloaded in place.
    pub supports_hot_reload: bool,
    /// Backing process id, required when discovered running.
    pub process_id: Option<u32>,
}

impl Discovery {
    /// A connector the daemon knows about but has not installed.
    #[must_use]
    pub fn available(id: ConnectorId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            state: RunningState::Available,
            enabled: false,
            supports_hot_reload: false,
            process_id: None,
        }
    }

    /// Overrides the observed phase.
    #[must_use]
    pub const fn in_state(mut self, state: RunningState) -> Self {
        self.state = state;
        self
    }

    /// Declares hot-reload support.
    #[must_use]
    pub const fn with_hot_reload(mut self, supported: bool) -> Self {
        self.supports_hot_reload = supported;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UpdateOrigin {
    state: RunningState,
    process_id: Option<u32>,
}

/// Authoritative lifecycle record for one connector.
///
/// Every mutation validates before it writes, so a record is never left
/// half-updated by a rejected change.
#[derive(Debug, Clone)]
pub struct ConnectorRecord {
    id: ConnectorId,
    name: String,
    enabled: bool,
    state: RunningState,
    supports_hot_reload: bool,
    process_id: Option<u32>,
    last_heartbeat: Option<OffsetDateTime>,
    data_count: u64,
    fault: Option<ConnectorFault>,
    resume_state: Option<RunningState>,
    update_origin: Option<UpdateOrigin>,
    manually_stopped: bool,
    state_since: OffsetDateTime,
    diverged_since: Option<OffsetDateTime>,
}

impl ConnectorRecord {
    /// Starts tracking a discovered connector.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::MissingProcessId`] when the connector is
    /// discovered in a process-bearing state without a process id.
    pub fn discovered(discovery: Discovery, now: OffsetDateTime) -> Result<Self, TransitionError> {
        let process_id = if discovery.state.has_process() {
            Some(
                discovery
                    .process_id
                    .ok_or_else(|| TransitionError::MissingProcessId {
                        id: discovery.id.clone(),
                    })?,
            )
        } else {
            None
        };
        let mut record = Self {
            id: discovery.id,
            name: discovery.name,
            enabled: discovery.enabled,
            state: discovery.state,
            supports_hot_reload: discovery.supports_hot_reload,
            process_id,
            last_heartbeat: None,
            data_count: 0,
            fault: None,
            resume_state: None,
            update_origin: None,
            manually_stopped: false,
            state_since: now,
            diverged_since: None,
        };
        record.refresh_divergence(now);
        Ok(record)
    }

    /// Connector identifier.
    #[must_use]
    pub const fn id(&self) -> &ConnectorId {
        &self.id
    }

    /// Current phase.
    #[must_use]
    pub const fn state(&self) -> RunningState {
        self.state
    }

    /// Declared-enabled flag.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether configuration can be reloaded in place.
    #[must_use]
    pub const fn supports_hot_reload(&self) -> bool {
        self.supports_hot_reload
    }

    /// Whether the last lifecycle command was a manual stop.
    #[must_use]
    pub const fn manually_stopped(&self) -> bool {
        self.manually_stopped
    }

    /// When the desired and observed phases started disagreeing.
    #[must_use]
    pub const fn diverged_since(&self) -> Option<OffsetDateTime> {
        self.diverged_since
    }

    /// Last time the connector proved it was alive.
    ///
    /// Falls back to the time the current phase was entered when no
    /// heartbeat has arrived since.
    #[must_use]
    pub fn last_sign_of_life(&self) -> OffsetDateTime {
        self.last_heartbeat
            .map_or(self.state_since, |heartbeat| heartbeat.max(self.state_since))
    }

    /// Phase a stop returns to.
    #[must_use]
    pub fn resume_state(&self) -> RunningState {
        self.resume_state.unwrap_or(RunningState::Enabled)
    }

    /// `enabled AND state ∉ {stopping, uninstalling, error}`.
    #[must_use]
    pub const fn should_be_running(&self) -> bool {
        self.enabled
            && !matches!(
                self.state,
                RunningState::Stopping | RunningState::Uninstalling | RunningState::Error
            )
    }

    /// Running with a heartbeat younger than `health_timeout`.
    #[must_use]
    pub fn is_healthy(&self, now: OffsetDateTime, health_timeout: Duration) -> bool {
        self.state == RunningState::Running
            && self
                .last_heartbeat
                .is_some_and(|heartbeat| now - heartbeat < health_timeout)
    }

    /// Checks whether moving to `to` is permitted from the current phase.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::Rejected`] for edges outside the table and
    /// [`TransitionError::HotReloadUnsupported`] when entering `updating`
    /// without declared support.
    pub fn check(&self, to: RunningState) -> Result<(), TransitionError> {
        use RunningState::{
            Available, Configured, Enabled, Error, Installed, Running, Stopping, Uninstalling,
            Updating,
        };

        let permitted = match (self.state, to) {
            (Uninstalling, _) | (Error, Error) => false,
            (_, Uninstalling | Error) => true,
            (Updating, target) => self.update_origin.is_some_and(|origin| origin.state == target),
            (_, Updating) => {
                if !self.supports_hot_reload {
                    return Err(TransitionError::HotReloadUnsupported {
                        id: self.id.clone(),
                    });
                }
                true
            }
            (Stopping, target) => target == self.resume_state(),
            (Available, Installed)
            | (Installed, Configured)
            | (Configured, Enabled)
            | (Enabled, Running)
            | (Running, Stopping)
            | (Error, Enabled | Configured) => true,
            _ => false,
        };
        if permitted {
            Ok(())
        } else {
            Err(TransitionError::rejected(&self.id, self.state, to))
        }
    }

    /// Moves to `to`, returning the previous phase.
    ///
    /// Entering `running` requires a process id unless the connector is
    /// returning from a hot reload, in which case the original process id is
    /// restored. A return to `stopping` restores it the same way. Entering `error` through this method records a generic
    /// fault; use [`ConnectorRecord::fail`] to supply the code.
    ///
    /// # Errors
    ///
    /// Returns the error from [`ConnectorRecord::check`], or
    /// [`TransitionError::MissingProcessId`] when entering `running` without
    /// a process id.
    pub fn transition(
        &mut self,
        to: RunningState,
        process_id: Option<u32>,
        now: OffsetDateTime,
    ) -> Result<RunningState, TransitionError> {
        if to == RunningState::Error {
            let fault = ConnectorFault::new(ErrorCode::InternalError, "connector reported an error");
            return self.fail(fault, now);
        }
        self.check(to)?;
        let origin = self.update_origin;
        let next_process_id = match to {
            RunningState::Running => process_id
                .or_else(|| origin.and_then(|origin| origin.process_id))
                .ok_or_else(|| TransitionError::MissingProcessId {
                    id: self.id.clone(),
                })
                .map(Some)?,
            RunningState::Stopping => self
                .process_id
                .or_else(|| origin.and_then(|origin| origin.process_id)),
            _ => None,
        };

        let from = self.state;
        match to {
            RunningState::Running if from == RunningState::Enabled => {
                self.resume_state = Some(from);
                self.manually_stopped = false;
            }
            RunningState::Updating => {
                self.update_origin = Some(UpdateOrigin {
                    state: from,
                    process_id: self.process_id,
                });
            }
            RunningState::Enabled => self.enabled = true,
            RunningState::Installed | RunningState::Configured => self.enabled = false,
            _ => {}
        }
        if from == RunningState::Updating {
            self.update_origin = None;
        }
        self.process_id = next_process_id;
        self.fault = None;
        self.enter(to, now);
        Ok(from)
    }

    /// Moves to `error` with the supplied fault, returning the previous phase.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::Rejected`] when already failed or
    /// uninstalling.
    pub fn fail(
        &mut self,
        fault: ConnectorFault,
        now: OffsetDateTime,
    ) -> Result<RunningState, TransitionError> {
        self.check(RunningState::Error)?;
        let from = self.state;
        self.process_id = None;
        self.update_origin = None;
        self.fault = Some(fault);
        self.enter(RunningState::Error, now);
        Ok(from)
    }

    /// Records a heartbeat.
    ///
    /// Older timestamps and lower data counts never overwrite newer ones.
    pub fn record_heartbeat(&mut self, at: OffsetDateTime, data_count: u64, now: OffsetDateTime) {
        self.last_heartbeat = Some(self.last_heartbeat.map_or(at, |last| last.max(at)));
        self.data_count = self.data_count.max(data_count);
        self.refresh_divergence(now);
    }

    /// Marks or clears a manual stop.
    pub const fn set_manually_stopped(&mut self, stopped: bool) {
        self.manually_stopped = stopped;
    }

    /// Whether the record may be deleted.
    #[must_use]
    pub fn is_removable(&self) -> bool {
        self.state == RunningState::Uninstalling
    }

    /// Immutable view of the record at `now`.
    #[must_use]
    pub fn status(&self, now: OffsetDateTime, health_timeout: Duration) -> ConnectorStatus {
        ConnectorStatus {
            id: self.id.clone(),
            name: self.name.clone(),
            enabled: self.enabled,
            state: self.state,
            healthy: self.is_healthy(now, health_timeout),
            should_be_running: self.should_be_running(),
            supports_hot_reload: self.supports_hot_reload,
            process_id: self.process_id,
            last_heartbeat: self.last_heartbeat,
            data_count: self.data_count,
            fault: self.fault.clone(),
        }
    }

    fn enter(&mut self, state: RunningState, now: OffsetDateTime) {
        self.state = state;
        self.state_since = now;
        self.refresh_divergence(now);
    }

    fn refresh_divergence(&mut self, now: OffsetDateTime) {
        if self.should_be_running() && self.state != RunningState::Running {
            self.diverged_since.get_or_insert(now);
        } else {
            self.diverged_since = None;
        }
    }
}
