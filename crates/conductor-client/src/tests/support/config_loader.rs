//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use conductor_config::{Config, LogFormat};
use ortho_config::OrthoError;

use crate::bootstrap::ConfigLoader;

/// Loader returning compact logging and a short request timeout.
pub struct TestConfigLoader;

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            log_format: LogFormat::Compact,
            request_timeout_ms: 50,
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing invalid CLI arguments.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("conductor"),
            OsString::from("--request-timeout-ms"),
            OsString::from("soon"),
        ];
        Config::load_from_iter(args)
    }
}

/// Loader whose configuration parses but violates a constraint.
pub struct InvalidConfigLoader;

impl ConfigLoader for InvalidConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            health_timeout_ms: 60_000,
            heartbeat_expiry_ms: 1_000,
            ..Config::default()
        })
    }
}
