//! Error types raised by the lifecycle model, the transport seam, and the
//! operation façade.
//!
//! Lifecycle and transport errors are local conditions. Before they reach a
//! caller the façade converts them into the same [`UiError`] shape used for
//! daemon failures, so presentation code handles a single error type.

use conductor_protocol::{
    ConnectorId, CorrelationId, EnvelopeError, ErrorBody, ErrorCategory, ErrorCode,
    ErrorDetails, RunningState, UiError,
};
use thiserror::Error;

use crate::operation::Operation;

/// A lifecycle change the model refused to apply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The edge is not in the transition table.
    #[error("connector {id} cannot move from {from} to {to}")]
    Rejected {
        /// Connector addressed.
        id: ConnectorId,
        /// Current state.
        from: RunningState,
        /// Requested state.
        to: RunningState,
    },
    /// No connector with this id is tracked.
    #[error("connector {id} is not known")]
    UnknownConnector {
        /// Connector addressed.
        id: ConnectorId,
    },
    /// A connector with this id is already tracked.
    #[error("connector {id} is already tracked")]
    DuplicateConnector {
        /// Connector addressed.
        id: ConnectorId,
    },
    /// The connector does not declare hot-reload support.
    #[error("connector {id} does not support hot reload")]
    HotReloadUnsupported {
        /// Connector addressed.
        id: ConnectorId,
    },
    /// A running state was reported without a process id.
    #[error("connector {id} reported running without a process id")]
    MissingProcessId {
        /// Connector addressed.
        id: ConnectorId,
    },
}

impl TransitionError {
    /// Creates a rejected transition error.
    #[must_use]
    pub fn rejected(id: &ConnectorId, from: RunningState, to: RunningState) -> Self {
        Self::Rejected {
            id: id.clone(),
            from,
            to,
        }
    }

    /// Creates an unknown connector error.
    #[must_use]
    pub fn unknown(id: &ConnectorId) -> Self {
        Self::UnknownConnector { id: id.clone() }
    }

    /// Connector the error concerns.
    #[must_use]
    pub const fn connector_id(&self) -> &ConnectorId {
        match self {
            Self::Rejected { id, .. }
            | Self::UnknownConnector { id }
            | Self::DuplicateConnector { id }
            | Self::HotReloadUnsupported { id }
            | Self::MissingProcessId { id } => id,
        }
    }

    /// Wire code reported when `operation` is refused for this reason.
    #[must_use]
    pub const fn error_code(&self, operation: Operation) -> ErrorCode {
        match self {
            Self::UnknownConnector { .. } => ErrorCode::ConnectorNotFound,
            Self::HotReloadUnsupported { .. } => ErrorCode::ConnectorHotReloadUnsupported,
            Self::Rejected { .. } | Self::DuplicateConnector { .. } | Self::MissingProcessId { .. } => {
                match operation {
                    Operation::Start => ErrorCode::ConnectorStartFailed,
                    Operation::Stop | Operation::Restart => ErrorCode::ConnectorStopFailed,
                    Operation::UpdateConfig => ErrorCode::ConnectorConfigInvalid,
                    Operation::Discover
                    | Operation::Install
                    | Operation::Enable
                    | Operation::Uninstall
                    | Operation::Health
                    | Operation::States => ErrorCode::ConnectorInvalidState,
                }
            }
        }
    }

    /// Structured error body for a refused `operation`.
    #[must_use]
    pub fn to_error_body(&self, operation: Operation) -> ErrorBody {
        ErrorBody::new(self.error_code(operation), self.to_string())
            .with_details(ErrorDetails::new().with_can_retry(false))
    }
}

/// Failures of the channel between the client and the daemon.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The channel could not carry the request.
    #[error("transport is disconnected: {reason}")]
    Disconnected {
        /// Description supplied by the transport.
        reason: String,
    },
    /// A request with this correlation id is already awaiting a response.
    #[error("a request with correlation id {correlation_id} is already in flight")]
    DuplicateCorrelationId {
        /// The clashing id.
        correlation_id: CorrelationId,
    },
    /// The envelope failed local validation.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    /// The pending entry was dropped before a response arrived.
    #[error("response channel closed before a response arrived")]
    ResponseDropped,
}

impl TransportError {
    /// Creates a disconnected error.
    #[must_use]
    pub fn disconnected(reason: impl Into<String>) -> Self {
        Self::Disconnected {
            reason: reason.into(),
        }
    }

    /// Wire code describing the failure.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Disconnected { .. } | Self::ResponseDropped => ErrorCode::ConnectionFailed,
            Self::DuplicateCorrelationId { .. } | Self::Envelope(_) => ErrorCode::InvalidRequest,
        }
    }

    /// Structured error body for the failure.
    #[must_use]
    pub fn to_error_body(&self) -> ErrorBody {
        ErrorBody::new(self.error_code(), self.to_string())
    }
}

/// A façade operation that did not succeed.
///
/// Wraps the classified [`UiError`], which also carries the correlation id of
/// the request when one was sent.
#[derive(Debug, Clone, Error)]
#[error("{} failed with {}: {}", .error.operation, .error.code, .error.message)]
pub struct OperationFailure {
    error: Box<UiError>,
}

impl OperationFailure {
    /// Wraps a classified error.
    #[must_use]
    pub fn new(error: UiError) -> Self {
        Self {
            error: Box::new(error),
        }
    }

    /// Classifies an error body for `operation`.
    #[must_use]
    pub fn from_body(
        operation: Operation,
        body: &ErrorBody,
        correlation_id: Option<CorrelationId>,
    ) -> Self {
        Self::new(UiError::from_body(operation.as_str(), body, correlation_id))
    }

    /// Failure raised by local pre-flight validation.
    #[must_use]
    pub fn rejected(operation: Operation, error: &TransitionError) -> Self {
        Self::from_body(operation, &error.to_error_body(operation), None)
    }

    /// Failure raised by the transport.
    #[must_use]
    pub fn transport(
        operation: Operation,
        error: &TransportError,
        correlation_id: Option<CorrelationId>,
    ) -> Self {
        Self::from_body(operation, &error.to_error_body(), correlation_id)
    }

    /// The classified error.
    #[must_use]
    pub fn error(&self) -> &UiError {
        &self.error
    }

    /// Consumes the failure, yielding the classified error.
    #[must_use]
    pub fn into_error(self) -> UiError {
        *self.error
    }

    /// Wire code of the failure.
    #[must_use]
    pub fn code(&self) -> &ErrorCode {
        &self.error.code
    }

    /// Semantic category of the failure.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.error.category
    }

    /// Correlation id of the request that failed, if one was sent.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&CorrelationId> {
        self.error.correlation_id.as_ref()
    }
}
