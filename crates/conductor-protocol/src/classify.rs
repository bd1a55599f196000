//! Semantic classification of structured errors.
//!
//! Classification is a table lookup keyed by the wire code. The table is built
//! once from the documented vocabulary, walking categories in precedence order
//! (critical, auth, network, input, config) so the first category to claim a
//! code keeps it. Codes that no category claims, including codes this build
//! has never heard of, fall back to the generic system category.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::codes::ErrorCode;
use crate::fault::ErrorBody;

/// Semantic bucket used to pick user-facing remediation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The connector or daemon is in an unrecoverable condition.
    Critical,
    /// Authentication is missing or was rejected.
    Auth,
    /// The channel to the daemon failed or timed out.
    Network,
    /// The caller sent an invalid request.
    Input,
    /// The connector configuration is invalid.
    Config,
    /// Anything else, including unknown codes.
    System,
}

impl ErrorCategory {
    /// Short label shown next to the error.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Critical => "critical error",
            Self::Auth => "authentication error",
            Self::Network => "network error",
            Self::Input => "input error",
            Self::Config => "configuration error",
            Self::System => "system error",
        }
    }

    /// Fixed remediation hint for the category.
    #[must_use]
    pub const fn suggested_action(self) -> &'static str {
        match self {
            Self::Critical => "restart the connector and contact support if it keeps failing",
            Self::Auth => "re-authenticate",
            Self::Network => "check connection and retry",
            Self::Input => "correct the request and try again",
            Self::Config => "review the connector configuration",
            Self::System => "contact support",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

const PRECEDENCE: [(ErrorCategory, &[&str]); 5] = [
    (
        ErrorCategory::Critical,
        &["CONNECTOR_CRASHED", "CONNECTOR_HEARTBEAT_LOST"],
    ),
    (
        ErrorCategory::Auth,
        &["IPC_AUTH_REQUIRED", "IPC_AUTH_FAILED"],
    ),
    (
        ErrorCategory::Network,
        &["IPC_CONNECTION_FAILED", "IPC_REQUEST_TIMEOUT"],
    ),
    (
        ErrorCategory::Input,
        &["IPC_INVALID_REQUEST", "IPC_MISSING_PARAMETER"],
    ),
    (
        ErrorCategory::Config,
        &["CONNECTOR_CONFIG_INVALID", "CONNECTOR_HOT_RELOAD_UNSUPPORTED"],
    ),
];

static CATEGORY_TABLE: Lazy<HashMap<&'static str, ErrorCategory>> = Lazy::new(|| {
    let mut table = HashMap::new();
    for (category, codes) in PRECEDENCE {
        for code in codes {
            table.entry(*code).or_insert(category);
        }
    }
    table
});

/// Maps an error code to its category. Total over all codes.
#[must_use]
pub fn categorize(code: &ErrorCode) -> ErrorCategory {
    CATEGORY_TABLE
        .get(code.as_str())
        .copied()
        .unwrap_or(ErrorCategory::System)
}

/// UX metadata derived from a structured error.
///
/// Classification never changes whether a call succeeded; it only annotates
/// a failure that already happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Semantic bucket.
    pub category: ErrorCategory,
    /// Fixed remediation hint for the category.
    pub suggested_action: &'static str,
    /// Whether offering a retry makes sense.
    pub retryable: bool,
    /// Whether the failure can be recovered without reinstallation.
    pub recoverable: bool,
    /// Minimum wait before retrying, when the daemon supplied one.
    pub retry_after: Option<Duration>,
}

/// Classifies a structured error.
///
/// The category depends on the code alone. Transport failures are always
/// retryable; auth and input failures never are. Every other category honours
/// the `canRetry` hint, falling back to the code's default.
#[must_use]
pub fn classify(error: &ErrorBody) -> Classification {
    let category = categorize(&error.code);
    let details = error.details.as_ref();
    let retryable = match category {
        ErrorCategory::Network => true,
        ErrorCategory::Auth | ErrorCategory::Input => false,
        ErrorCategory::Critical | ErrorCategory::Config | ErrorCategory::System => error
            .can_retry()
            .unwrap_or_else(|| error.code.retryable_by_default()),
    };
    let recoverable = details
        .and_then(|details| details.recoverable())
        .unwrap_or(category != ErrorCategory::Critical);
    Classification {
        category,
        suggested_action: category.suggested_action(),
        retryable,
        recoverable,
        retry_after: details.and_then(|details| details.retry_after()),
    }
}
