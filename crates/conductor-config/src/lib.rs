//! Shared configuration for the conductor client layer.
//!
//! Configuration is layered by `ortho_config`: built-in defaults are overridden
//! by a configuration file, then by `CONDUCTOR_*` environment variables, and
//! finally by command-line flags. The resolved [`Config`] carries logging
//! settings plus the timing knobs used by the lifecycle model, the status
//! synchroniser, and the operation façade.

mod defaults;
mod logging;

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_HEALTH_TIMEOUT_MS, DEFAULT_HEARTBEAT_EXPIRY_MS, DEFAULT_LOG_FILTER,
    DEFAULT_NOTIFICATION_CAPACITY, DEFAULT_RECONCILIATION_GRACE_MS, DEFAULT_REQUEST_TIMEOUT_MS,
    default_log_filter, default_log_filter_string, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CONDUCTOR")]
pub struct Config {
    /// `tracing` filter expression applied to the telemetry subscriber.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for structured logs.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Milliseconds to wait for a response matching a request.
    #[ortho_config(default = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub request_timeout_ms: u64,
    /// Heartbeat age in milliseconds beyond which a connector is unhealthy.
    #[ortho_config(default = DEFAULT_HEALTH_TIMEOUT_MS)]
    pub health_timeout_ms: u64,
    /// Heartbeat age in milliseconds beyond which a running connector fails.
    #[ortho_config(default = DEFAULT_HEARTBEAT_EXPIRY_MS)]
    pub heartbeat_expiry_ms: u64,
    /// Milliseconds a desired/observed mismatch may persist before surfacing.
    #[ortho_config(default = DEFAULT_RECONCILIATION_GRACE_MS)]
    pub reconciliation_grace_ms: u64,
    /// Buffer size of the status change notification channel.
    #[ortho_config(default = DEFAULT_NOTIFICATION_CAPACITY)]
    pub notification_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            health_timeout_ms: DEFAULT_HEALTH_TIMEOUT_MS,
            heartbeat_expiry_ms: DEFAULT_HEARTBEAT_EXPIRY_MS,
            reconciliation_grace_ms: DEFAULT_RECONCILIATION_GRACE_MS,
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Loads configuration from an explicit argument list.
    ///
    /// The first item is treated as the binary name, mirroring
    /// [`std::env::args_os`].
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Filter expression for the telemetry subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Output format for structured logs.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Time to wait for a response before reporting `IPC_REQUEST_TIMEOUT`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Heartbeat age beyond which a running connector is unhealthy.
    #[must_use]
    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }

    /// Heartbeat age beyond which a running connector is moved to `error`.
    #[must_use]
    pub fn heartbeat_expiry(&self) -> Duration {
        Duration::from_millis(self.heartbeat_expiry_ms)
    }

    /// Grace period before a reconciliation failure is reported.
    #[must_use]
    pub fn reconciliation_grace(&self) -> Duration {
        Duration::from_millis(self.reconciliation_grace_ms)
    }

    /// Capacity of the change notification channel.
    #[must_use]
    pub fn notification_capacity(&self) -> usize {
        self.notification_capacity
    }

    /// Checks cross-field constraints that layered loading cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a timeout or the channel capacity is zero,
    /// or when heartbeat expiry would fire before a connector turns unhealthy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("request_timeout_ms", self.request_timeout_ms),
            ("health_timeout_ms", self.health_timeout_ms),
            ("heartbeat_expiry_ms", self.heartbeat_expiry_ms),
            ("reconciliation_grace_ms", self.reconciliation_grace_ms),
        ];
        if let Some((field, _)) = durations.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ZeroDuration { field });
        }
        if self.notification_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.heartbeat_expiry_ms < self.health_timeout_ms {
            return Err(ConfigError::ExpiryBeforeHealthTimeout {
                expiry_ms: self.heartbeat_expiry_ms,
                health_timeout_ms: self.health_timeout_ms,
            });
        }
        Ok(())
    }
}

/// Constraint violations detected after configuration has been merged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A duration setting was zero.
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },
    /// The notification channel capacity was zero.
    #[error("notification_capacity must be greater than zero")]
    ZeroCapacity,
    /// Heartbeat expiry was shorter than the health timeout.
    #[error(
        "heartbeat_expiry_ms ({expiry_ms}) must not be shorter than health_timeout_ms ({health_timeout_ms})"
    )]
    ExpiryBeforeHealthTimeout {
        expiry_ms: u64,
        health_timeout_ms: u64,
    },
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn defaults_pass_validation() {
        Config::default().validate().expect("defaults are valid");
    }

    #[test]
    fn exposes_durations() {
        let config = Config {
            request_timeout_ms: 250,
            ..Config::default()
        };
        assert_eq!(config.request_timeout(), Duration::from_millis(250));
        assert_eq!(
            config.health_timeout(),
            Duration::from_millis(DEFAULT_HEALTH_TIMEOUT_MS)
        );
    }

    #[rstest]
    #[case::request(Config { request_timeout_ms: 0, ..Config::default() }, "request_timeout_ms")]
    #[case::health(Config { health_timeout_ms: 0, ..Config::default() }, "health_timeout_ms")]
    #[case::grace(
        Config { reconciliation_grace_ms: 0, ..Config::default() },
        "reconciliation_grace_ms"
    )]
    fn rejects_zero_durations(#[case] config: Config, #[case] expected: &'static str) {
        let error = config.validate().expect_err("zero duration must fail");
        assert_eq!(error, ConfigError::ZeroDuration { field: expected });
    }

    #[test]
    fn rejects_zero_capacity() {
        let config = Config {
            notification_capacity: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroCapacity));
    }

    #[test]
    fn rejects_expiry_shorter_than_health_timeout() {
        let config = Config {
            health_timeout_ms: 5_000,
            heartbeat_expiry_ms: 1_000,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ExpiryBeforeHealthTimeout { .. })
        ));
    }
}
