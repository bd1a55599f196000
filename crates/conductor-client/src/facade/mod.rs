//! Operation façade.
//!
//! Each lifecycle command is checked against the local model first, so a
//! transition the model would refuse never reaches the daemon. Accepted
//! commands are sent as request envelopes through a [`RequestSink`] and
//! awaited on the [`ResponseRouter`] with a timeout. The daemon's verdict is
//! authoritative: a failed response leaves the model untouched and is
//! returned as a classified [`OperationFailure`], while a successful one is
//! replayed into the [`StatusSynchronizer`] as state events.

use std::sync::Arc;
use std::time::Duration;

use conductor_protocol::commands::{self, ConnectorAction};
use conductor_protocol::{
    ConnectorDefinition, ConnectorId, ConnectorInfo, CorrelationId, EnvelopeError, ErrorBody,
    ErrorCode, ErrorDetails, HealthReport, OperationResult, Params, Payload, PayloadShape,
    Request, RunningState, StateOverview,
};
use tokio::sync::broadcast;

use crate::errors::{OperationFailure, TransitionError, TransportError};
use crate::lifecycle::{ConnectorStatus, Discovery};
use crate::operation::Operation;
use crate::reporter::LifecycleReporter;
use crate::router::{PendingGuard, ResponseRouter};
use crate::sync::{StatusChange, StatusEvent, StatusSynchronizer};

const FACADE_TARGET: &str = "conductor_client::facade";

/// Forward path from install to enabled, in order.
const INSTALL_CHAIN: [RunningState; 3] = [
    RunningState::Installed,
    RunningState::Configured,
    RunningState::Enabled,
];

/// Outbound half of the transport.
///
/// Implementations hand the envelope to the channel and return immediately;
/// the matching response arrives later through [`ResponseRouter::deliver`].
#[cfg_attr(test, mockall::automock)]
pub trait RequestSink: Send + Sync {
    /// Sends a request to the daemon.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the channel cannot carry the request.
    fn dispatch(&self, request: &Request) -> Result<(), TransportError>;
}

impl<T> RequestSink for Arc<T>
where
    T: RequestSink + ?Sized,
{
    fn dispatch(&self, request: &Request) -> Result<(), TransportError> {
        (**self).dispatch(request)
    }
}

struct Reply {
    payload: Option<Payload>,
    correlation_id: CorrelationId,
}

impl Reply {
    fn decode<T: PayloadShape>(self, operation: Operation) -> Result<T, OperationFailure> {
        let Self {
            payload,
            correlation_id,
        } = self;
        payload
            .ok_or(EnvelopeError::UnexpectedPayload {
                expected: T::SHAPE,
                found: "nothing",
            })
            .and_then(Payload::decode::<T>)
            .map_err(|error| {
                OperationFailure::transport(
                    operation,
                    &TransportError::from(error),
                    Some(correlation_id),
                )
            })
    }

    fn decode_or<T, F>(self, operation: Operation, fallback: F) -> Result<T, OperationFailure>
    where
        T: PayloadShape,
        F: FnOnce() -> T,
    {
        if self.payload.is_none() {
            return Ok(fallback());
        }
        self.decode(operation)
    }
}

/// Issues lifecycle commands and keeps the local model in step.
pub struct ConnectorClient<S> {
    sink: S,
    router: Arc<ResponseRouter>,
    synchronizer: Arc<StatusSynchronizer>,
    reporter: Arc<dyn LifecycleReporter>,
    request_timeout: Duration,
}

impl<S> ConnectorClient<S>
where
    S: RequestSink,
{
    /// Wires a client from its collaborators.
    #[must_use]
    pub fn new(
        sink: S,
        router: Arc<ResponseRouter>,
        synchronizer: Arc<StatusSynchronizer>,
        reporter: Arc<dyn LifecycleReporter>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            sink,
            router,
            synchronizer,
            reporter,
            request_timeout,
        }
    }

    /// The router responses must be delivered to.
    #[must_use]
    pub fn router(&self) -> &Arc<ResponseRouter> {
        &self.router
    }

    /// The synchroniser owning the lifecycle model.
    #[must_use]
    pub fn synchronizer(&self) -> &Arc<StatusSynchronizer> {
        &self.synchronizer
    }

    /// Snapshot of one connector.
    #[must_use]
    pub fn status(&self, id: &ConnectorId) -> Option<ConnectorStatus> {
        self.synchronizer.snapshot(id)
    }

    /// Subscribes to connector change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.synchronizer.subscribe()
    }

    /// `GET /connectors`. Newly seen connectors start being tracked.
    ///
    /// # Errors
    ///
    /// Returns [`OperationFailure`] when the request fails or times out.
    pub async fn discover(&self) -> Result<Vec<ConnectorDefinition>, OperationFailure> {
        let operation = Operation::Discover;
        let definitions: Vec<ConnectorDefinition> = self
            .call(operation, commands::discover())
            .await?
            .decode(operation)?;
        for definition in &definitions {
            if self.synchronizer.is_tracked(&definition.id) {
                continue;
            }
            // Unknown installation status is treated as not installed.
            let state = if definition.installed == Some(true) {
                RunningState::Installed
            } else {
                RunningState::Available
            };
            let discovery = Discovery::available(definition.id.clone(), definition.name.clone())
                .in_state(state)
                .with_hot_reload(definition.supports_hot_reload);
            self.record(StatusEvent::discovered(discovery));
        }
        Ok(definitions)
    }

    /// `POST /connectors/{id}/install`.
    ///
    /// Connectors not yet tracked are added as `available` before the
    /// daemon's reported state is replayed along the install path.
    ///
    /// # Errors
    ///
    /// Returns [`OperationFailure`] when the connector is already installed,
    /// or when the request fails or times out.
    pub async fn install(
        &self,
        id: &ConnectorId,
        source: &str,
        config: Params,
    ) -> Result<ConnectorInfo, OperationFailure> {
        let operation = Operation::Install;
        let tracked = self.synchronizer.is_tracked(id);
        if tracked {
            self.preflight(operation, id, RunningState::Installed)?;
        }
        let info: ConnectorInfo = self
            .call(operation, commands::install(id, source, config))
            .await?
            .decode(operation)?;
        if !tracked {
            let discovery = Discovery::available(id.clone(), info.name.clone())
                .with_hot_reload(info.supports_hot_reload);
            self.record(StatusEvent::discovered(discovery));
        }
        self.advance(id, info.state);
        Ok(info)
    }

    /// `PUT /connectors/{id}/config`.
    ///
    /// Installed or failed connectors become `configured`. A running
    /// connector that supports hot reload passes through `updating` while the
    /// request is in flight; one that does not keeps running and the result
    /// reports whether a restart is required.
    ///
    /// # Errors
    ///
    /// Returns [`OperationFailure`] when the connector is unknown or busy, or
    /// when the request fails or times out.
    pub async fn update_config(
        &self,
        id: &ConnectorId,
        config: Params,
    ) -> Result<OperationResult, OperationFailure> {
        let operation = Operation::UpdateConfig;
        let current = self.current(operation, id)?;
        let next = match current.state {
            RunningState::Installed | RunningState::Error => RunningState::Configured,
            RunningState::Configured | RunningState::Enabled | RunningState::Running => {
                current.state
            }
            other => {
                return Err(self.reject(
                    operation,
                    &TransitionError::rejected(id, other, RunningState::Configured),
                ));
            }
        };
        if next != current.state {
            self.preflight(operation, id, next)?;
        }
        let hot_reload = current.state == RunningState::Running && current.supports_hot_reload;
        if hot_reload {
            self.preflight(operation, id, RunningState::Updating)?;
            self.record(StatusEvent::state(id.clone(), RunningState::Updating, None));
        }

        let outcome = self
            .call(operation, commands::update_config(id, config))
            .await
            .and_then(|reply| {
                reply.decode_or(operation, || OperationResult::new(id.clone(), next))
            });
        if hot_reload {
            self.record(StatusEvent::state(id.clone(), current.state, None));
        }
        let result = outcome?;
        if next != current.state {
            self.record(StatusEvent::state(id.clone(), next, None));
        }
        Ok(result)
    }

    /// `POST /connectors/{id}/enable`.
    ///
    /// # Errors
    ///
    /// Returns [`OperationFailure`] when the connector cannot be enabled from
    /// its current state, or when the request fails or times out.
    pub async fn enable(&self, id: &ConnectorId) -> Result<OperationResult, OperationFailure> {
        let result = self
            .action(id, ConnectorAction::Enable, RunningState::Enabled)
            .await?;
        self.record(StatusEvent::state(id.clone(), RunningState::Enabled, None));
        Ok(result)
    }

    /// `POST /connectors/{id}/start`.
    ///
    /// # Errors
    ///
    /// Returns [`OperationFailure`] when the connector is not enabled, or
    /// when the daemon fails the start. The local state is unchanged in both
    /// cases.
    pub async fn start(&self, id: &ConnectorId) -> Result<OperationResult, OperationFailure> {
        let result = self
            .action(id, ConnectorAction::Start, RunningState::Running)
            .await?;
        self.record(StatusEvent::state(
            id.clone(),
            result.state,
            result.process_id,
        ));
        Ok(result)
    }

    /// `POST /connectors/{id}/stop`.
    ///
    /// A successful stop is remembered as manual, which exempts the
    /// connector from reconciliation until it is started again.
    ///
    /// # Errors
    ///
    /// Returns [`OperationFailure`] when the connector is not running, or
    /// when the request fails or times out.
    pub async fn stop(&self, id: &ConnectorId) -> Result<OperationResult, OperationFailure> {
        let result = self
            .action(id, ConnectorAction::Stop, RunningState::Stopping)
            .await?;
        self.record(StatusEvent::state(id.clone(), RunningState::Stopping, None));
        self.record(StatusEvent::state(id.clone(), result.state, None));
        if let Err(error) = self.synchronizer.set_manually_stopped(id, true) {
            self.note_unapplied(&error);
        }
        Ok(result)
    }

    /// `POST /connectors/{id}/restart`.
    ///
    /// # Errors
    ///
    /// Returns [`OperationFailure`] when the connector is not running, or
    /// when the request fails or times out.
    pub async fn restart(&self, id: &ConnectorId) -> Result<OperationResult, OperationFailure> {
        let resume = self.synchronizer.resume_state(id);
        let result = self
            .action(id, ConnectorAction::Restart, RunningState::Stopping)
            .await?;
        self.record(StatusEvent::state(id.clone(), RunningState::Stopping, None));
        if let Some(resume) = resume {
            self.record(StatusEvent::state(id.clone(), resume, None));
        }
        self.record(StatusEvent::state(
            id.clone(),
            result.state,
            result.process_id,
        ));
        Ok(result)
    }

    /// `POST /connectors/{id}/uninstall`. The connector is removed from the
    /// model once the daemon confirms.
    ///
    /// # Errors
    ///
    /// Returns [`OperationFailure`] when the connector is unknown or already
    /// uninstalling, or when the request fails or times out.
    pub async fn uninstall(&self, id: &ConnectorId) -> Result<(), OperationFailure> {
        let operation = Operation::Uninstall;
        self.preflight(operation, id, RunningState::Uninstalling)?;
        self.call(operation, commands::action(id, ConnectorAction::Uninstall))
            .await?;
        self.record(StatusEvent::state(
            id.clone(),
            RunningState::Uninstalling,
            None,
        ));
        self.record(StatusEvent::removed(id.clone()));
        Ok(())
    }

    /// `GET /connectors/health`.
    ///
    /// # Errors
    ///
    /// Returns [`OperationFailure`] when the request fails or times out.
    pub async fn health(&self) -> Result<HealthReport, OperationFailure> {
        let operation = Operation::Health;
        self.call(operation, commands::health())
            .await?
            .decode(operation)
    }

    /// `GET /connectors/states`.
    ///
    /// # Errors
    ///
    /// Returns [`OperationFailure`] when the request fails or times out.
    pub async fn states(&self) -> Result<StateOverview, OperationFailure> {
        let operation = Operation::States;
        self.call(operation, commands::states())
            .await?
            .decode(operation)
    }

    /// Sends an arbitrary request and awaits its response.
    ///
    /// A correlation id is generated when the request has none.
    ///
    /// # Errors
    ///
    /// Returns [`OperationFailure`] when the envelope is invalid, the
    /// transport refuses it, the daemon answers with a failure, or no
    /// response arrives within the request timeout.
    pub async fn send(
        &self,
        operation: Operation,
        request: Request,
    ) -> Result<Option<Payload>, OperationFailure> {
        self.call(operation, request).await.map(|reply| reply.payload)
    }

    async fn action(
        &self,
        id: &ConnectorId,
        action: ConnectorAction,
        target: RunningState,
    ) -> Result<OperationResult, OperationFailure> {
        let operation = Operation::from(action);
        self.preflight(operation, id, target)?;
        self.call(operation, commands::action(id, action))
            .await?
            .decode_or(operation, || OperationResult::new(id.clone(), target))
    }

    async fn call(
        &self,
        operation: Operation,
        mut request: Request,
    ) -> Result<Reply, OperationFailure> {
        let correlation_id = request.ensure_correlation_id();
        let transport_failure = |error: &TransportError| {
            OperationFailure::transport(operation, error, Some(correlation_id.clone()))
        };
        if let Err(error) = request
            .validate()
            .and_then(|()| request.resolved_path().map(drop))
        {
            return Err(transport_failure(&TransportError::from(error)));
        }
        let receiver = self
            .router
            .register(correlation_id.clone())
            .map_err(|error| transport_failure(&error))?;
        let _pending = PendingGuard::new(&self.router, correlation_id.clone());
        if let Err(error) = self.sink.dispatch(&request) {
            return Err(transport_failure(&error));
        }
        tracing::debug!(
            target: FACADE_TARGET,
            operation = %operation,
            correlation_id = %correlation_id,
            method = %request.method(),
            path = request.path(),
            "request dispatched"
        );

        match tokio::time::timeout(self.request_timeout, receiver).await {
            Ok(Ok(response)) => match response.into_result() {
                Ok(payload) => Ok(Reply {
                    payload,
                    correlation_id,
                }),
                Err(body) => {
                    tracing::debug!(
                        target: FACADE_TARGET,
                        operation = %operation,
                        correlation_id = %correlation_id,
                        code = %body.code,
                        "daemon reported failure"
                    );
                    Err(OperationFailure::from_body(
                        operation,
                        &body,
                        Some(correlation_id),
                    ))
                }
            },
            Ok(Err(_)) => Err(transport_failure(&TransportError::ResponseDropped)),
            Err(_) => {
                self.reporter
                    .request_timed_out(&correlation_id, request.path());
                let body = ErrorBody::new(
                    ErrorCode::RequestTimeout,
                    format!(
                        "no response to {} {} within {} ms",
                        request.method(),
                        request.path(),
                        self.request_timeout.as_millis()
                    ),
                )
                .with_details(ErrorDetails::new().with_can_retry(true));
                Err(OperationFailure::from_body(
                    operation,
                    &body,
                    Some(correlation_id),
                ))
            }
        }
    }

    fn current(
        &self,
        operation: Operation,
        id: &ConnectorId,
    ) -> Result<ConnectorStatus, OperationFailure> {
        self.synchronizer
            .snapshot(id)
            .ok_or_else(|| self.reject(operation, &TransitionError::unknown(id)))
    }

    fn preflight(
        &self,
        operation: Operation,
        id: &ConnectorId,
        to: RunningState,
    ) -> Result<(), OperationFailure> {
        self.synchronizer
            .check(id, to)
            .map_err(|error| self.reject(operation, &error))
    }

    fn reject(&self, operation: Operation, error: &TransitionError) -> OperationFailure {
        self.reporter.transition_rejected(error);
        OperationFailure::rejected(operation, error)
    }

    fn advance(&self, id: &ConnectorId, target: RunningState) {
        let Some(last) = INSTALL_CHAIN.iter().position(|state| *state == target) else {
            self.record(StatusEvent::state(id.clone(), target, None));
            return;
        };
        let first = self
            .synchronizer
            .snapshot(id)
            .and_then(|status| INSTALL_CHAIN.iter().position(|state| *state == status.state))
            .map_or(0, |index| index + 1);
        for state in INSTALL_CHAIN.iter().take(last + 1).skip(first) {
            self.record(StatusEvent::state(id.clone(), *state, None));
        }
    }

    fn record(&self, event: StatusEvent) {
        if let Err(error) = self.synchronizer.apply(event) {
            self.note_unapplied(&error);
        }
    }

    fn note_unapplied(&self, error: &TransitionError) {
        tracing::debug!(
            target: FACADE_TARGET,
            connector = %error.connector_id(),
            error = %error,
            "daemon outcome not applied to the lifecycle model"
        );
    }
}

#[cfg(test)]
mod tests;
