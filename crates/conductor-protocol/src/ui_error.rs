//! UI-facing error records and display-session deduplication.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::classify::{ErrorCategory, classify};
use crate::codes::ErrorCode;
use crate::fault::ErrorBody;
use crate::ids::CorrelationId;

/// Error record handed to the presentation layer.
///
/// Identity is the pair `(code, operation)`: two failures of the same
/// operation with the same code are the same error for display purposes even
/// when they were raised at different times or carry different ids.
#[derive(Debug, Clone)]
pub struct UiError {
    /// Identifier for correlating with daemon logs.
    pub id: String,
    /// Error code from the failed response.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Name of the operation that failed, for example `start`.
    pub operation: String,
    /// When the failure was recorded.
    pub timestamp: OffsetDateTime,
    /// Semantic category.
    pub category: ErrorCategory,
    /// Fixed remediation hint for the category.
    pub suggested_action: &'static str,
    /// Whether the failure can be recovered without reinstallation.
    pub recoverable: bool,
    /// Whether a retry affordance should be offered.
    pub retryable: bool,
    /// Minimum wait before retrying.
    pub retry_after: Option<Duration>,
    /// Diagnostic trace supplied by the daemon.
    pub trace: Option<String>,
    /// Correlation id of the request that failed.
    pub correlation_id: Option<CorrelationId>,
}

impl UiError {
    /// Builds a record for a failure of `operation`, stamped now.
    #[must_use]
    pub fn from_body(
        operation: impl Into<String>,
        body: &ErrorBody,
        correlation_id: Option<CorrelationId>,
    ) -> Self {
        Self::at(operation, body, correlation_id, OffsetDateTime::now_utc())
    }

    /// Builds a record with an explicit timestamp.
    #[must_use]
    pub fn at(
        operation: impl Into<String>,
        body: &ErrorBody,
        correlation_id: Option<CorrelationId>,
        timestamp: OffsetDateTime,
    ) -> Self {
        let classification = classify(body);
        let details = body.details.as_ref();
        let id = details
            .and_then(|details| details.error_id())
            .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);
        Self {
            id,
            code: body.code.clone(),
            message: body.message.clone(),
            operation: operation.into(),
            timestamp,
            category: classification.category,
            suggested_action: classification.suggested_action,
            recoverable: classification.recoverable,
            retryable: classification.retryable,
            retry_after: classification.retry_after,
            trace: details.and_then(|details| details.trace()).map(str::to_owned),
            correlation_id,
        }
    }

    /// Category label shown next to the message.
    #[must_use]
    pub const fn category_label(&self) -> &'static str {
        self.category.label()
    }

    fn key(&self) -> (&ErrorCode, &str) {
        (&self.code, self.operation.as_str())
    }
}

impl PartialEq for UiError {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for UiError {}

impl Hash for UiError {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// Errors shown during one display session, coalesced by identity.
#[derive(Debug, Default)]
pub struct ErrorSession {
    errors: Vec<UiError>,
    seen: HashSet<(ErrorCode, String)>,
}

impl ErrorSession {
    /// Starts an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error, returning `false` when an equal one is already shown.
    pub fn record(&mut self, error: UiError) -> bool {
        let key = (error.code.clone(), error.operation.clone());
        if !self.seen.insert(key) {
            return false;
        }
        self.errors.push(error);
        true
    }

    /// Removes the error matching `code` and `operation`, if shown.
    pub fn dismiss(&mut self, code: &ErrorCode, operation: &str) -> Option<UiError> {
        let index = self
            .errors
            .iter()
            .position(|error| error.key() == (code, operation))?;
        self.seen.remove(&(code.clone(), operation.to_owned()));
        Some(self.errors.remove(index))
    }

    /// Errors in first-seen order.
    #[must_use]
    pub fn errors(&self) -> &[UiError] {
        &self.errors
    }

    /// Number of distinct errors shown.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns `true` when nothing is shown.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Ends the session.
    pub fn clear(&mut self) {
        self.errors.clear();
        self.seen.clear();
    }
}
