//! Client bootstrap orchestration.

use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

use conductor_config::{Config, ConfigError};

use crate::clock::{Clock, SystemClock};
use crate::facade::{ConnectorClient, RequestSink};
use crate::reporter::LifecycleReporter;
use crate::router::ResponseRouter;
use crate::sync::StatusSynchronizer;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the client configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader error when no layer combination yields a valid
    /// configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Configuration loaded but violates a constraint.
    #[error("invalid configuration: {source}")]
    Invalid {
        /// Violated constraint.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
}

/// Result of a successful bootstrap invocation.
pub struct Conductor<S> {
    config: Config,
    client: ConnectorClient<S>,
    telemetry: TelemetryHandle,
}

impl<S> Conductor<S>
where
    S: RequestSink,
{
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// The operation façade.
    #[must_use]
    pub fn client(&self) -> &ConnectorClient<S> {
        &self.client
    }

    /// Router the transport hands decoded responses to.
    #[must_use]
    pub fn router(&self) -> &Arc<ResponseRouter> {
        self.client.router()
    }

    /// Synchroniser the transport hands decoded status events to.
    #[must_use]
    pub fn synchronizer(&self) -> &Arc<StatusSynchronizer> {
        self.client.synchronizer()
    }
}

/// Bootstraps the client using the supplied collaborators.
///
/// `connect` receives the response router and returns the outbound half of
/// the transport; the inbound half delivers responses to that router.
///
/// # Errors
///
/// Returns [`BootstrapError`] when configuration cannot be loaded or
/// validated, or when telemetry cannot be installed. Each failure is also
/// reported through `reporter`.
pub fn bootstrap_with<S, F>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn LifecycleReporter>,
    connect: F,
) -> Result<Conductor<S>, BootstrapError>
where
    S: RequestSink,
    F: FnOnce(Arc<ResponseRouter>) -> S,
{
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    if let Err(source) = config.validate() {
        let error = BootstrapError::Invalid { source };
        reporter.bootstrap_failed(&error);
        return Err(error);
    }

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let synchronizer = Arc::new(StatusSynchronizer::from_config(
        &config,
        clock,
        reporter.clone(),
    ));
    let router = Arc::new(ResponseRouter::new(reporter.clone()));
    let sink = connect(router.clone());
    let client = ConnectorClient::new(
        sink,
        router,
        synchronizer,
        reporter.clone(),
        config.request_timeout(),
    );
    reporter.bootstrap_succeeded(&config);

    Ok(Conductor {
        config,
        client,
        telemetry,
    })
}
