//! BDD world for the bootstrap suite: encapsulates loader, reporter, and the
//! bootstrapped client for step functions.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Arc;

use conductor_protocol::{HealthReport, Payload};
use tokio::runtime::Runtime;

use crate::bootstrap::{BootstrapError, Conductor, ConfigLoader, bootstrap_with};
use crate::errors::OperationFailure;

use super::config_loader::{FailingConfigLoader, InvalidConfigLoader, TestConfigLoader};
use super::daemon::{DaemonReply, ScriptedDaemon};
use super::reporter::RecordingLifecycleReporter;

/// Scenario world shared across bootstrap steps.
pub struct TestWorld {
    loader: Box<dyn ConfigLoader>,
    pub reporter: Arc<RecordingLifecycleReporter>,
    conductor: Option<Conductor<Arc<ScriptedDaemon>>>,
    daemon: Option<Arc<ScriptedDaemon>>,
    bootstrap_error: Option<BootstrapError>,
    health: Option<Result<HealthReport, OperationFailure>>,
}

impl TestWorld {
    /// Builds a world with a successful configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            loader: Box::new(TestConfigLoader),
            reporter: Arc::new(RecordingLifecycleReporter::default()),
            conductor: None,
            daemon: None,
            bootstrap_error: None,
            health: None,
        }
    }

    /// Installs a loader that fails to parse its arguments.
    pub fn use_failing_loader(&mut self) {
        self.loader = Box::new(FailingConfigLoader);
        self.reset_results();
    }

    /// Installs a loader whose configuration violates a constraint.
    pub fn use_invalid_loader(&mut self) {
        self.loader = Box::new(InvalidConfigLoader);
        self.reset_results();
    }

    /// Installs a loader that succeeds.
    pub fn use_successful_loader(&mut self) {
        self.loader = Box::new(TestConfigLoader);
        self.reset_results();
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.conductor.is_some() || self.bootstrap_error.is_some() {
            return;
        }

        let mut daemon = None;
        let result = bootstrap_with(&*self.loader, self.reporter.clone(), |router| {
            let sink = Arc::new(ScriptedDaemon::new(router));
            daemon = Some(sink.clone());
            sink
        });
        match result {
            Ok(conductor) => {
                self.conductor = Some(conductor);
                self.daemon = daemon;
            }
            Err(error) => {
                self.bootstrap_error = Some(error);
            }
        }
    }

    /// Queries daemon health through the bootstrapped client.
    pub fn request_health(&mut self, score: u8) {
        let (Some(conductor), Some(daemon)) = (self.conductor.as_ref(), self.daemon.as_ref())
        else {
            return;
        };
        let report = HealthReport {
            score,
            subsystems: BTreeMap::new(),
        };
        daemon.reply(
            "/connectors/health",
            DaemonReply::Success(Payload::from(report)),
        );
        let runtime = Runtime::new().expect("tokio runtime");
        self.health = Some(runtime.block_on(conductor.client().health()));
    }

    /// Returns the bootstrap error, if any.
    #[must_use]
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    /// Returns the bootstrapped client, if any.
    #[must_use]
    pub fn conductor(&self) -> Option<&Conductor<Arc<ScriptedDaemon>>> {
        self.conductor.as_ref()
    }

    /// Returns the last health result, if any.
    #[must_use]
    pub fn health(&self) -> Option<&Result<HealthReport, OperationFailure>> {
        self.health.as_ref()
    }

    fn reset_results(&mut self) {
        self.conductor = None;
        self.daemon = None;
        self.bootstrap_error = None;
        self.health = None;
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default test world fixture.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
