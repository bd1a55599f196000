//! Events consumed and emitted by the status synchroniser.

use conductor_protocol::{ConnectorId, ErrorCode, RunningState};
use time::OffsetDateTime;

use crate::lifecycle::{ConnectorFault, ConnectorStatus, Discovery};

/// Decoded out-of-band status event from the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    /// Connector the event concerns.
    pub connector_id: ConnectorId,
    /// What happened.
    pub kind: StatusEventKind,
}

/// Payload of a [`StatusEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEventKind {
    /// A connector became known. Rejected when it is already tracked.
    Discovered {
        /// Display name.
        name: String,
        /// Phase observed at discovery.
        state: RunningState,
        /// Declared-enabled flag.
        enabled: bool,
        /// Whether configuration can be reloaded in place.
        supports_hot_reload: bool,
        /// Backing process id, required when discovered running.
        process_id: Option<u32>,
    },
    /// The connector moved to a new phase.
    StateChanged {
        /// New phase.
        state: RunningState,
        /// Backing process id when the new phase has one.
        process_id: Option<u32>,
    },
    /// The connector failed.
    Failed {
        /// Failure code.
        code: ErrorCode,
        /// Human-readable description.
        message: String,
    },
    /// Liveness signal from a running connector.
    Heartbeat {
        /// When the connector emitted the heartbeat.
        at: OffsetDateTime,
        /// Observational record counter.
        data_count: u64,
    },
    /// Uninstallation finished and the connector no longer exists.
    Removed,
}

impl StatusEvent {
    /// Event announcing a newly discovered connector.
    #[must_use]
    pub fn discovered(discovery: Discovery) -> Self {
        Self {
            connector_id: discovery.id,
            kind: StatusEventKind::Discovered {
                name: discovery.name,
                state: discovery.state,
                enabled: discovery.enabled,
                supports_hot_reload: discovery.supports_hot_reload,
                process_id: discovery.process_id,
            },
        }
    }

    /// Event reporting a phase change.
    #[must_use]
    pub fn state(connector_id: ConnectorId, state: RunningState, process_id: Option<u32>) -> Self {
        Self {
            connector_id,
            kind: StatusEventKind::StateChanged { state, process_id },
        }
    }

    /// Event reporting a failure.
    #[must_use]
    pub fn failed(connector_id: ConnectorId, fault: ConnectorFault) -> Self {
        Self {
            connector_id,
            kind: StatusEventKind::Failed {
                code: fault.code,
                message: fault.message,
            },
        }
    }

    /// Heartbeat event.
    #[must_use]
    pub const fn heartbeat(connector_id: ConnectorId, at: OffsetDateTime, data_count: u64) -> Self {
        Self {
            connector_id,
            kind: StatusEventKind::Heartbeat { at, data_count },
        }
    }

    /// Event reporting completed removal.
    #[must_use]
    pub const fn removed(connector_id: ConnectorId) -> Self {
        Self {
            connector_id,
            kind: StatusEventKind::Removed,
        }
    }
}

/// Change notification published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChange {
    /// The observable status of a connector changed.
    Updated(ConnectorStatus),
    /// The connector was removed.
    Removed(ConnectorId),
}

impl StatusChange {
    /// Connector the change concerns.
    #[must_use]
    pub const fn connector_id(&self) -> &ConnectorId {
        match self {
            Self::Updated(status) => &status.id,
            Self::Removed(id) => id,
        }
    }
}

/// Connector that should be running but has not been for too long.
///
/// Distinct from a hard error: tooling decides whether to retry the start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationFailure {
    /// Connector concerned.
    pub id: ConnectorId,
    /// When the desired and observed phases started disagreeing.
    pub desired_since: OffsetDateTime,
    /// Phase currently observed.
    pub observed: RunningState,
}
