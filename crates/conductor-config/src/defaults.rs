use crate::logging::LogFormat;

/// Default log filter expression used by the client layer.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default time to wait for a response matching a request's correlation id.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Default heartbeat age beyond which a running connector reports unhealthy.
pub const DEFAULT_HEALTH_TIMEOUT_MS: u64 = 15_000;

/// Default heartbeat age beyond which a running connector is moved to `error`.
pub const DEFAULT_HEARTBEAT_EXPIRY_MS: u64 = 45_000;

/// Default grace period before a desired/observed mismatch is surfaced.
pub const DEFAULT_RECONCILIATION_GRACE_MS: u64 = 30_000;

/// Default buffer size of the status change notification channel.
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 256;

/// Default log filter expression used by the client layer.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}
