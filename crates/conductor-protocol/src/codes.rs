//! Machine-readable error code vocabulary.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable error identifier carried by failed responses.
///
/// The vocabulary is closed for classification purposes, but codes introduced
/// by newer daemons still round-trip through [`ErrorCode::Other`] unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorCode {
    /// `IPC_CONNECTION_FAILED`: the channel to the daemon could not be used.
    ConnectionFailed,
    /// `IPC_AUTH_REQUIRED`: the call needs an authenticated session.
    AuthRequired,
    /// `IPC_AUTH_FAILED`: presented credentials were rejected.
    AuthFailed,
    /// `IPC_INVALID_REQUEST`: the envelope was malformed.
    InvalidRequest,
    /// `IPC_MISSING_PARAMETER`: a required parameter was absent.
    MissingParameter,
    /// `IPC_REQUEST_TIMEOUT`: no response arrived in time.
    RequestTimeout,
    /// `CONNECTOR_NOT_FOUND`: the connector id is unknown.
    ConnectorNotFound,
    /// `CONNECTOR_CONFIG_INVALID`: the supplied configuration was rejected.
    ConnectorConfigInvalid,
    /// `CONNECTOR_START_FAILED`: the connector could not be started.
    ConnectorStartFailed,
    /// `CONNECTOR_STOP_FAILED`: the connector could not be stopped.
    ConnectorStopFailed,
    /// `CONNECTOR_INVALID_STATE`: the command is not valid in the current state.
    ConnectorInvalidState,
    /// `CONNECTOR_HOT_RELOAD_UNSUPPORTED`: the connector cannot reload in place.
    ConnectorHotReloadUnsupported,
    /// `CONNECTOR_CRASHED`: the backing process exited unexpectedly.
    ConnectorCrashed,
    /// `CONNECTOR_HEARTBEAT_LOST`: a running connector stopped sending heartbeats.
    ConnectorHeartbeatLost,
    /// `INTERNAL_ERROR`: unexpected daemon failure.
    InternalError,
    /// `SERVICE_UNAVAILABLE`: the daemon is degraded or shutting down.
    ServiceUnavailable,
    /// `RESOURCE_NOT_FOUND`: the addressed resource does not exist.
    ResourceNotFound,
    /// Any code outside the documented vocabulary, kept verbatim.
    Other(String),
}

impl ErrorCode {
    /// Every documented code, in vocabulary order.
    pub const KNOWN: [Self; 17] = [
        Self::ConnectionFailed,
        Self::AuthRequired,
        Self::AuthFailed,
        Self::InvalidRequest,
        Self::MissingParameter,
        Self::RequestTimeout,
        Self::ConnectorNotFound,
        Self::ConnectorConfigInvalid,
        Self::ConnectorStartFailed,
        Self::ConnectorStopFailed,
        Self::ConnectorInvalidState,
        Self::ConnectorHotReloadUnsupported,
        Self::ConnectorCrashed,
        Self::ConnectorHeartbeatLost,
        Self::InternalError,
        Self::ServiceUnavailable,
        Self::ResourceNotFound,
    ];

    /// Wire representation of the code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ConnectionFailed => "IPC_CONNECTION_FAILED",
            Self::AuthRequired => "IPC_AUTH_REQUIRED",
            Self::AuthFailed => "IPC_AUTH_FAILED",
            Self::InvalidRequest => "IPC_INVALID_REQUEST",
            Self::MissingParameter => "IPC_MISSING_PARAMETER",
            Self::RequestTimeout => "IPC_REQUEST_TIMEOUT",
            Self::ConnectorNotFound => "CONNECTOR_NOT_FOUND",
            Self::ConnectorConfigInvalid => "CONNECTOR_CONFIG_INVALID",
            Self::ConnectorStartFailed => "CONNECTOR_START_FAILED",
            Self::ConnectorStopFailed => "CONNECTOR_STOP_FAILED",
            Self::ConnectorInvalidState => "CONNECTOR_INVALID_STATE",
            Self::ConnectorHotReloadUnsupported => "CONNECTOR_HOT_RELOAD_UNSUPPORTED",
            Self::ConnectorCrashed => "CONNECTOR_CRASHED",
            Self::ConnectorHeartbeatLost => "CONNECTOR_HEARTBEAT_LOST",
            Self::InternalError => "INTERNAL_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::ResourceNotFound => "RESOURCE_NOT_FOUND",
            Self::Other(code) => code.as_str(),
        }
    }

    /// Returns `true` when the code belongs to the documented vocabulary.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Whether a failure with this code is worth retrying when the daemon
    /// gave no explicit `canRetry` hint.
    ///
    /// Transport faults are always retry candidates; internal faults are
    /// retryable with backoff. Everything else needs caller or operator action.
    #[must_use]
    pub const fn retryable_by_default(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed
                | Self::RequestTimeout
                | Self::InternalError
                | Self::ServiceUnavailable
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl From<&str> for ErrorCode {
    fn from(value: &str) -> Self {
        Self::KNOWN
            .iter()
            .find(|code| code.as_str() == value)
            .cloned()
            .unwrap_or_else(|| Self::Other(value.to_owned()))
    }
}

impl From<String> for ErrorCode {
    fn from(value: String) -> Self {
        match Self::from(value.as_str()) {
            Self::Other(_) => Self::Other(value),
            known => known,
        }
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::Other(value) => value,
            known => known.as_str().to_owned(),
        }
    }
}
