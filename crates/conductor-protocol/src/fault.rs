//! Structured error bodies carried by failed responses.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::codes::ErrorCode;

const CAN_RETRY: &str = "canRetry";
const RETRY_AFTER: &str = "retryAfter";
const RECOVERABLE: &str = "recoverable";
const ERROR_ID: &str = "errorId";
const TRACE: &str = "trace";

/// Machine-readable failure reported by the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable code drawn from the error vocabulary.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional structured context such as retry hints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

impl ErrorBody {
    /// Builds an error body without details.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Attaches structured details.
    #[must_use]
    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = Some(details);
        self
    }

    /// Shortcut for `details.canRetry`, when present.
    #[must_use]
    pub fn can_retry(&self) -> Option<bool> {
        self.details.as_ref().and_then(ErrorDetails::can_retry)
    }
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.code, self.message)
    }
}

/// Arbitrary key-value context attached to an error.
///
/// Well-known keys have typed accessors; everything else is preserved as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorDetails(Map<String, Value>);

impl ErrorDetails {
    /// Creates an empty details bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing any previous value for the key.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Sets the `canRetry` hint.
    #[must_use]
    pub fn with_can_retry(self, can_retry: bool) -> Self {
        self.with(CAN_RETRY, can_retry)
    }

    /// Sets the `retryAfter` hint in whole seconds.
    #[must_use]
    pub fn with_retry_after(self, after: Duration) -> Self {
        self.with(RETRY_AFTER, after.as_secs())
    }

    /// Raw value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether the daemon considers the operation safe to retry.
    #[must_use]
    pub fn can_retry(&self) -> Option<bool> {
        self.get(CAN_RETRY).and_then(Value::as_bool)
    }

    /// Minimum wait before retrying, encoded as seconds.
    ///
    /// Fractional and negative values are ignored.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        self.get(RETRY_AFTER)
            .and_then(Value::as_u64)
            .map(Duration::from_secs)
    }

    /// Whether the connector can recover without reinstallation.
    #[must_use]
    pub fn recoverable(&self) -> Option<bool> {
        self.get(RECOVERABLE).and_then(Value::as_bool)
    }

    /// Daemon-side error identifier for cross-referencing logs.
    #[must_use]
    pub fn error_id(&self) -> Option<&str> {
        self.get(ERROR_ID).and_then(Value::as_str)
    }

    /// Diagnostic trace, when the daemon supplied one.
    #[must_use]
    pub fn trace(&self) -> Option<&str> {
        self.get(TRACE).and_then(Value::as_str)
    }

    /// Returns `true` when no keys are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_typed_hints() {
        let details = ErrorDetails::new()
            .with_can_retry(true)
            .with_retry_after(Duration::from_secs(30))
            .with(ERROR_ID, "err-9");
        assert_eq!(details.can_retry(), Some(true));
        assert_eq!(details.retry_after(), Some(Duration::from_secs(30)));
        assert_eq!(details.error_id(), Some("err-9"));
        assert_eq!(details.recoverable(), None);
    }

    #[test]
    fn ignores_mistyped_hints() {
        let details = ErrorDetails::new()
            .with(CAN_RETRY, "yes")
            .with(RETRY_AFTER, -5);
        assert_eq!(details.can_retry(), None);
        assert_eq!(details.retry_after(), None);
    }

    #[test]
    fn omits_absent_details_on_the_wire() {
        let body = ErrorBody::new(ErrorCode::ConnectorNotFound, "no such connector");
        let json = serde_json::to_value(&body).expect("serialise body");
        assert_eq!(
            json,
            serde_json::json!({"code": "CONNECTOR_NOT_FOUND", "message": "no such connector"})
        );
    }
}
