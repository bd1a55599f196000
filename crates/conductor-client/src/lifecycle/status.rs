//! Immutable connector snapshots handed to readers.

use conductor_protocol::{ConnectorId, ErrorCode, RunningState};
use serde::Serialize;
use time::OffsetDateTime;

/// Error recorded while a connector is in the `error` phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorFault {
    /// Code describing the failure.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
}

impl ConnectorFault {
    /// Creates a fault.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Derived aggregate status of one connector at a point in time.
///
/// Two snapshots compare equal exactly when every observable field matches,
/// which is what change notifications are deduplicated on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorStatus {
    /// Stable identifier.
    pub id: ConnectorId,
    /// Display name.
    pub name: String,
    /// Declared-enabled flag.
    pub enabled: bool,
    /// Observed phase.
    pub state: RunningState,
    /// Running and heartbeating within the health timeout.
    pub healthy: bool,
    /// Desired phase derived from the enabled flag and observed phase.
    pub should_be_running: bool,
    /// Whether configuration can be reloaded in place.
    pub supports_hot_reload: bool,
    /// Backing process id, present only while a process exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_id: Option<u32>,
    /// Most recent heartbeat.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_heartbeat: Option<OffsetDateTime>,
    /// Observational record counter reported by heartbeats.
    pub data_count: u64,
    /// Fault details, present only in the `error` phase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<ConnectorFault>,
}
