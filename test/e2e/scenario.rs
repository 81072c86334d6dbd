//! End-to-end scenario against the in-memory platform.
//!
//! Runs the Node and PHP samples through provisioning, deployment, polling,
//! verification, stop, and sweep, and checks that teardown always leaves an
//! empty space.
//!
//! ## Running
//!
//! ```bash
//! cargo test -p paasprobe-e2e --test scenario
//! ```

use std::time::Duration;

use paasprobe_lifecycle::scenario::{DEFAULT_APP_NAME, DEFAULT_SERVICE_NAME};
use paasprobe_lifecycle::{
    sweep, Scenario, ScenarioConfig, ScenarioFailure, Stage, VerifyError, WaitError,
};
use paasprobe_platform::{
    AppState, EnvironmentSnapshot, InMemoryPlatform, Operation, PlatformClient,
};
use serde_json::json;
use tempfile::NamedTempFile;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,paasprobe_lifecycle=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

fn archive() -> NamedTempFile {
    tempfile::Builder::new()
        .prefix("standalone-node-app")
        .suffix(".zip")
        .tempfile()
        .unwrap()
}

async fn logged_in(platform: InMemoryPlatform) -> InMemoryPlatform {
    platform.login().await.unwrap();
    platform
}

async fn assert_space_empty(platform: &InMemoryPlatform) {
    assert!(platform.list_services().await.unwrap().is_empty());
    assert!(platform.list_applications().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_node_sample_end_to_end() {
    init_tracing();
    let platform = logged_in(InMemoryPlatform::new().with_start_sequence(vec![
        AppState::Stopped,
        AppState::Starting,
        AppState::Starting,
        AppState::Started,
    ]))
    .await;
    let archive = archive();

    let report = Scenario::node(&ScenarioConfig::default(), archive.path())
        .run(&platform)
        .await
        .unwrap();

    assert_eq!(report.service.name, DEFAULT_SERVICE_NAME);
    assert_eq!(report.service.label, "cleardb");
    assert_eq!(report.service.plan, "spark");
    assert_eq!(report.application.name, DEFAULT_APP_NAME);
    assert!(report.application.state.is_started());
    assert_eq!(report.application.uris, vec!["seaclouds_test-0.cfapps.io"]);
    // One lookup after creation, then four polls.
    assert_eq!(platform.get_application_calls().await, 5);
    assert_eq!(report.elapsed, Duration::from_secs(15));

    let snapshot = report.environment.expect("node sample verifies the environment");
    let services = snapshot
        .section("system_env_json")
        .and_then(|s| s.get("VCAP_SERVICES"))
        .and_then(|v| v.as_object())
        .unwrap();
    assert!(services.contains_key("cleardb"));

    sweep(&platform).await.into_result().unwrap();
    assert_space_empty(&platform).await;
}

#[tokio::test(start_paused = true)]
async fn test_php_sample_end_to_end() {
    init_tracing();
    let platform = logged_in(InMemoryPlatform::new()).await;
    let archive = archive();

    let report = Scenario::php(&ScenarioConfig::default(), archive.path())
        .run(&platform)
        .await
        .unwrap();

    assert!(report.application.staging.buildpack.is_some());
    assert_eq!(report.application.services, vec![DEFAULT_SERVICE_NAME]);
    assert!(report.environment.is_none());

    let calls = platform.calls().await;
    let create = calls
        .iter()
        .position(|op| *op == Operation::CreateApplication)
        .unwrap();
    let bind = calls
        .iter()
        .position(|op| *op == Operation::BindService)
        .unwrap();
    assert!(create < bind);

    sweep(&platform).await.into_result().unwrap();
    assert_space_empty(&platform).await;
}

#[tokio::test(start_paused = true)]
async fn test_teardown_after_failed_verification_leaves_space_empty() {
    init_tracing();
    let platform = logged_in(InMemoryPlatform::new()).await;
    platform
        .override_environment(EnvironmentSnapshot::from_value(json!({
            "system_env_json": { "VCAP_SERVICES": { "elephantsql": [] } },
            "application_env_json": {
                "VCAP_APPLICATION": { "application_name": DEFAULT_APP_NAME }
            },
        })))
        .await;
    let archive = archive();

    let err = Scenario::node(&ScenarioConfig::default(), archive.path())
        .run(&platform)
        .await
        .unwrap_err();

    assert_eq!(err.stage, Stage::Verification);
    match err.verify_error() {
        Some(VerifyError::ServiceLabelMissing { label, available }) => {
            assert_eq!(label, "cleardb");
            assert_eq!(available, &vec!["elephantsql".to_string()]);
        }
        other => panic!("expected missing label, got {other:?}"),
    }
    assert_eq!(
        platform.calls().await.last(),
        Some(&Operation::StopApplication)
    );

    sweep(&platform).await.into_result().unwrap();
    assert_space_empty(&platform).await;
}

#[tokio::test(start_paused = true)]
async fn test_bounded_wait_times_out_and_still_stops() {
    init_tracing();
    let platform = logged_in(
        InMemoryPlatform::new().with_start_sequence(vec![AppState::Starting]),
    )
    .await;
    let archive = archive();
    let config = ScenarioConfig {
        max_wait: Some(Duration::from_secs(30)),
        ..ScenarioConfig::default()
    };

    let err = Scenario::node(&config, archive.path())
        .run(&platform)
        .await
        .unwrap_err();

    assert_eq!(err.stage, Stage::Polling);
    match &err.source {
        ScenarioFailure::Wait(WaitError::TimedOut {
            polls, last_state, ..
        }) => {
            assert_eq!(*polls, 7);
            assert_eq!(*last_state, AppState::Starting);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(
        platform.calls().await.last(),
        Some(&Operation::StopApplication)
    );

    sweep(&platform).await.into_result().unwrap();
    assert_space_empty(&platform).await;
}

#[tokio::test]
async fn test_sweep_attempts_both_deletions_when_services_fail() {
    init_tracing();
    let platform = logged_in(InMemoryPlatform::new()).await;
    platform.fail(Operation::DeleteAllServices).await;

    let report = sweep(&platform).await;

    assert!(report.services_error.is_some());
    assert!(report.applications_error.is_none());
    assert!(platform
        .calls()
        .await
        .contains(&Operation::DeleteAllApplications));
    assert_eq!(report.into_result().unwrap_err().stage, Stage::Cleanup);
}
