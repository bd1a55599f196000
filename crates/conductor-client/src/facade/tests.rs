//! Unit tests for the operation façade.

use std::sync::Arc;
use std::time::Duration;

use conductor_protocol::{
    ConnectorDefinition, ConnectorId, ErrorCode, OperationResult, Params, Payload, RunningState,
};
use rstest::rstest;
use serde_json::json;
use time::macros::datetime;

use super::*;
use crate::clock::ManualClock;
use crate::lifecycle::Discovery;
use crate::sync::{StatusSynchronizer, SyncTiming};
use crate::tests::support::{
    DaemonReply, LifecycleEvent, REQUEST_TIMEOUT, RecordingLifecycleReporter, ScriptedDaemon,
};

struct Fixture<S> {
    client: ConnectorClient<S>,
    reporter: Arc<RecordingLifecycleReporter>,
}

fn assemble<S, F>(connect: F) -> Fixture<S>
where
    S: RequestSink,
    F: FnOnce(Arc<ResponseRouter>) -> S,
{
    let clock = Arc::new(ManualClock::starting_at(datetime!(2026-03-01 12:00 UTC)));
    let reporter = Arc::new(RecordingLifecycleReporter::default());
    let timing = SyncTiming {
        health_timeout: Duration::from_secs(15),
        heartbeat_expiry: Duration::from_secs(45),
        reconciliation_grace: Duration::from_secs(30),
    };
    let synchronizer = Arc::new(StatusSynchronizer::new(
        timing,
        32,
        clock,
        reporter.clone(),
    ));
    let router = Arc::new(ResponseRouter::new(reporter.clone()));
    let sink = connect(router.clone());
    Fixture {
        client: ConnectorClient::new(
            sink,
            router,
            synchronizer,
            reporter.clone(),
            REQUEST_TIMEOUT,
        ),
        reporter,
    }
}

fn scripted() -> (Fixture<Arc<ScriptedDaemon>>, Arc<ScriptedDaemon>) {
    let mut daemon = None;
    let fixture = assemble(|router| {
        let sink = Arc::new(ScriptedDaemon::new(router));
        daemon = Some(sink.clone());
        sink
    });
    (fixture, daemon.expect("daemon created"))
}

fn c1() -> ConnectorId {
    ConnectorId::new("c1")
}

fn track<S: RequestSink>(client: &ConnectorClient<S>, discovery: Discovery) {
    client
        .synchronizer()
        .apply(StatusEvent::discovered(discovery))
        .expect("track connector");
}

fn running(hot_reload: bool) -> Discovery {
    let mut discovery = Discovery::available(c1(), "Mail")
        .in_state(RunningState::Running)
        .with_hot_reload(hot_reload);
    discovery.enabled = true;
    discovery.process_id = Some(4242);
    discovery
}

fn result(state: RunningState) -> OperationResult {
    OperationResult::new(c1(), state)
}

fn config() -> Params {
    match json!({ "pollIntervalSecs": 30 }) {
        serde_json::Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

#[rstest]
#[case::start_from_available(RunningState::Available, ErrorCode::ConnectorStartFailed)]
#[case::start_from_installed(RunningState::Installed, ErrorCode::ConnectorStartFailed)]
#[tokio::test]
async fn rejected_transitions_are_never_dispatched(
    #[case] state: RunningState,
    #[case] expected: ErrorCode,
) {
    let fixture = assemble(|_| {
        let mut sink = MockRequestSink::new();
        sink.expect_dispatch().never();
        sink
    });
    track(
        &fixture.client,
        Discovery::available(c1(), "Mail").in_state(state),
    );

    let failure = fixture.client.start(&c1()).await.expect_err("rejected");

    assert_eq!(failure.code(), &expected);
    assert_eq!(failure.correlation_id(), None);
    assert!(
        fixture
            .reporter
            .events()
            .iter()
            .any(|event| matches!(event, LifecycleEvent::TransitionRejected(_)))
    );
}

#[tokio::test]
async fn unknown_connectors_are_not_found() {
    let fixture = assemble(|_| {
        let mut sink = MockRequestSink::new();
        sink.expect_dispatch().never();
        sink
    });
    let failure = fixture.client.stop(&c1()).await.expect_err("unknown");
    assert_eq!(failure.code(), &ErrorCode::ConnectorNotFound);
}

#[tokio::test]
async fn transport_refusal_releases_the_correlation_id() {
    let fixture = assemble(|_| {
        let mut sink = MockRequestSink::new();
        sink.expect_dispatch()
            .times(1)
            .returning(|_| Err(TransportError::disconnected("pipe closed")));
        sink
    });

    let failure = fixture.client.health().await.expect_err("refused");

    assert_eq!(failure.code(), &ErrorCode::ConnectionFailed);
    assert!(failure.error().retryable);
    assert!(failure.correlation_id().is_some());
    assert_eq!(fixture.client.router().pending(), 0);
}

#[tokio::test]
async fn disconnected_daemon_is_a_retryable_network_failure() {
    let (fixture, daemon) = scripted();
    track(&fixture.client, running(false));
    daemon.reply(
        "/connectors/c1/stop",
        DaemonReply::Disconnect("socket closed by peer".to_owned()),
    );

    let failure = fixture.client.stop(&c1()).await.expect_err("disconnected");

    assert_eq!(failure.code(), &ErrorCode::ConnectionFailed);
    assert_eq!(failure.category(), conductor_protocol::ErrorCategory::Network);
    assert!(failure.error().retryable);
    assert!(failure.error().message.contains("socket closed by peer"));
    assert_eq!(fixture.client.router().pending(), 0);
    let status = fixture.client.status(&c1()).expect("tracked");
    assert_eq!(status.state, RunningState::Running);
    assert_eq!(status.process_id, Some(4242));
}

#[tokio::test]
async fn abandoned_calls_leave_nothing_pending() {
    let (fixture, daemon) = scripted();
    for _ in 0..3 {
        daemon.reply("/connectors/health", DaemonReply::Silent);
    }

    for _ in 0..3 {
        let abandoned =
            tokio::time::timeout(Duration::from_millis(1), fixture.client.health()).await;
        assert!(abandoned.is_err(), "call should still be waiting");
    }

    assert_eq!(fixture.client.router().pending(), 0);
    assert_eq!(daemon.paths().len(), 3);
}

#[tokio::test]
async fn discovery_tracks_new_connectors_once() {
    let (fixture, daemon) = scripted();
    let definitions = vec![
        ConnectorDefinition {
            id: c1(),
            name: "Mail".to_owned(),
            version: None,
            description: None,
            supports_hot_reload: true,
            installed: Some(true),
        },
        ConnectorDefinition {
            id: ConnectorId::new("c2"),
            name: "Files".to_owned(),
            version: None,
            description: None,
            supports_hot_reload: false,
            installed: None,
        },
    ];
    for _ in 0..2 {
        daemon.reply(
            "/connectors",
            DaemonReply::Success(Payload::from(definitions.clone())),
        );
    }

    let first = fixture.client.discover().await.expect("discover");
    fixture.client.discover().await.expect("rediscover");

    assert_eq!(first, definitions);
    let c1_status = fixture.client.status(&c1()).expect("c1 tracked");
    assert_eq!(c1_status.state, RunningState::Installed);
    assert!(c1_status.supports_hot_reload);
    let c2_status = fixture
        .client
        .status(&ConnectorId::new("c2"))
        .expect("c2 tracked");
    assert_eq!(c2_status.state, RunningState::Available);
    assert!(
        !fixture
            .reporter
            .events()
            .iter()
            .any(|event| matches!(event, LifecycleEvent::TransitionRejected(_)))
    );
}

#[tokio::test]
async fn hot_reload_passes_through_updating() {
    let (fixture, daemon) = scripted();
    track(&fixture.client, running(true));
    let mut reloaded = result(RunningState::Running);
    reloaded.hot_reload_applied = Some(true);
    reloaded.requires_restart = Some(false);
    daemon.reply(
        "/connectors/c1/config",
        DaemonReply::Success(Payload::from(reloaded.clone())),
    );
    let mut changes = fixture.client.subscribe();

    let outcome = fixture
        .client
        .update_config(&c1(), config())
        .await
        .expect("update");

    assert_eq!(outcome, reloaded);
    let first = changes.try_recv().expect("updating published");
    assert!(matches!(
        first,
        StatusChange::Updated(status) if status.state == RunningState::Updating
    ));
    let status = fixture.client.status(&c1()).expect("tracked");
    assert_eq!(status.state, RunningState::Running);
    assert_eq!(status.process_id, Some(4242));
    let body = daemon.requests().pop().and_then(|request| request.body().cloned());
    assert_eq!(body, Some(config()));
}

#[tokio::test]
async fn config_update_without_hot_reload_keeps_running() {
    let (fixture, daemon) = scripted();
    track(&fixture.client, running(false));
    let mut pending = result(RunningState::Running);
    pending.requires_restart = Some(true);
    daemon.reply(
        "/connectors/c1/config",
        DaemonReply::Success(Payload::from(pending)),
    );

    let outcome = fixture
        .client
        .update_config(&c1(), config())
        .await
        .expect("update");

    assert_eq!(outcome.requires_restart, Some(true));
    let status = fixture.client.status(&c1()).expect("tracked");
    assert_eq!(status.state, RunningState::Running);
}

#[tokio::test]
async fn failed_hot_reload_restores_the_running_state() {
    let (fixture, daemon) = scripted();
    track(&fixture.client, running(true));
    daemon.reply(
        "/connectors/c1/config",
        DaemonReply::Failure(conductor_protocol::ErrorBody::new(
            ErrorCode::ConnectorConfigInvalid,
            "pollIntervalSecs must be positive",
        )),
    );

    let failure = fixture
        .client
        .update_config(&c1(), config())
        .await
        .expect_err("invalid config");

    assert_eq!(failure.code(), &ErrorCode::ConnectorConfigInvalid);
    assert_eq!(failure.category(), conductor_protocol::ErrorCategory::Config);
    let status = fixture.client.status(&c1()).expect("tracked");
    assert_eq!(status.state, RunningState::Running);
    assert_eq!(status.process_id, Some(4242));
}

#[tokio::test]
async fn configuring_an_installed_connector() {
    let (fixture, daemon) = scripted();
    track(
        &fixture.client,
        Discovery::available(c1(), "Mail").in_state(RunningState::Installed),
    );
    daemon.reply("/connectors/c1/config", DaemonReply::Acknowledge);

    let outcome = fixture
        .client
        .update_config(&c1(), config())
        .await
        .expect("configure");

    assert_eq!(outcome.state, RunningState::Configured);
    let status = fixture.client.status(&c1()).expect("tracked");
    assert_eq!(status.state, RunningState::Configured);
}

#[tokio::test]
async fn restart_resumes_with_the_new_process() {
    let (fixture, daemon) = scripted();
    track(&fixture.client, running(false));
    let mut restarted = result(RunningState::Running);
    restarted.process_id = Some(5151);
    restarted.was_running = Some(true);
    daemon.reply(
        "/connectors/c1/restart",
        DaemonReply::Success(Payload::from(restarted)),
    );

    fixture.client.restart(&c1()).await.expect("restart");

    let status = fixture.client.status(&c1()).expect("tracked");
    assert_eq!(status.state, RunningState::Running);
    assert_eq!(status.process_id, Some(5151));
    let visited: Vec<_> = fixture
        .reporter
        .events()
        .into_iter()
        .filter_map(|event| match event {
            LifecycleEvent::TransitionApplied { to, .. } => Some(to),
            _ => None,
        })
        .collect();
    assert_eq!(
        visited,
        vec![
            RunningState::Stopping,
            RunningState::Enabled,
            RunningState::Running
        ]
    );
}

#[tokio::test]
async fn uninstall_removes_the_connector() {
    let (fixture, daemon) = scripted();
    track(
        &fixture.client,
        Discovery::available(c1(), "Mail").in_state(RunningState::Configured),
    );
    daemon.reply("/connectors/c1/uninstall", DaemonReply::Acknowledge);
    let mut changes = fixture.client.subscribe();

    fixture.client.uninstall(&c1()).await.expect("uninstall");

    assert!(fixture.client.status(&c1()).is_none());
    let mut last = None;
    while let Ok(change) = changes.try_recv() {
        last = Some(change);
    }
    assert_eq!(last, Some(StatusChange::Removed(c1())));
}

#[tokio::test]
async fn enable_accepts_an_empty_acknowledgement() {
    let (fixture, daemon) = scripted();
    track(
        &fixture.client,
        Discovery::available(c1(), "Mail").in_state(RunningState::Configured),
    );
    daemon.reply("/connectors/c1/enable", DaemonReply::Acknowledge);

    let outcome = fixture.client.enable(&c1()).await.expect("enable");

    assert_eq!(outcome.state, RunningState::Enabled);
    let status = fixture.client.status(&c1()).expect("tracked");
    assert!(status.enabled);
    assert!(status.should_be_running);
    assert!(!status.healthy);
}

#[tokio::test]
async fn mismatched_payloads_are_reported_not_guessed() {
    let (fixture, daemon) = scripted();
    daemon.reply("/connectors/states", DaemonReply::Acknowledge);

    let failure = fixture.client.states().await.expect_err("no payload");

    assert_eq!(failure.code(), &ErrorCode::InvalidRequest);
    assert_eq!(daemon.paths(), vec!["/connectors/states".to_owned()]);
}
