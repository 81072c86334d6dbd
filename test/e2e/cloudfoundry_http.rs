//! Cloud Foundry v2 client against a mock API server.
//!
//! ## Running
//!
//! ```bash
//! cargo test -p paasprobe-e2e --test cloudfoundry_http
//! ```

use std::time::Duration;

use paasprobe_lifecycle::{
    verify_environment, EnvironmentExpectations, LifecycleWaiter, WaitError,
};
use paasprobe_platform::{
    AppState, CloudFoundryClient, Credentials, PlatformClient, PlatformError, TargetConfig,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

fn page(resources: Vec<Value>) -> Value {
    json!({
        "total_results": resources.len(),
        "next_url": null,
        "resources": resources,
    })
}

fn resource(guid: &str, entity: Value) -> Value {
    json!({ "metadata": { "guid": guid, "url": format!("/v2/x/{guid}") }, "entity": entity })
}

fn summary(state: &str) -> Value {
    let running = u32::from(state == "STARTED");
    json!({
        "guid": "app-1",
        "name": "seaclouds_test-0",
        "state": state,
        "memory": 512,
        "instances": 1,
        "running_instances": running,
        "command": "node app.js",
        "routes": [{
            "guid": "route-1",
            "host": "seaclouds_test-0",
            "domain": { "guid": "dom-1", "name": "cfapps.io" },
        }],
        "services": [{ "guid": "si-1", "name": "mysql-test" }],
    })
}

fn config(server: &MockServer) -> TargetConfig {
    TargetConfig::new(&server.uri(), Credentials::new("user", "secret")).unwrap()
}

/// Mount info, token, org, and space endpoints.
async fn mount_login(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v2/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "authorization_endpoint": server.uri(),
            "token_endpoint": server.uri(),
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("username=user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": TOKEN,
            "token_type": "bearer",
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/organizations"))
        .and(query_param("q", "name:rsucasas-org"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![resource(
            "org-1",
            json!({ "name": "rsucasas-org" }),
        )])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/organizations/org-1/spaces"))
        .and(query_param("q", "name:development"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![resource(
            "space-1",
            json!({ "name": "development" }),
        )])))
        .mount(server)
        .await;
}

async fn mount_app_lookup(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v2/spaces/space-1/apps"))
        .and(query_param("q", "name:seaclouds_test-0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![resource(
            "app-1",
            json!({ "name": "seaclouds_test-0" }),
        )])))
        .mount(server)
        .await;
}

async fn logged_in(server: &MockServer) -> CloudFoundryClient {
    mount_login(server).await;
    let client = CloudFoundryClient::new(&config(server)).unwrap();
    client.login().await.unwrap();
    client
}

#[tokio::test]
async fn test_login_resolves_org_and_space() {
    let server = MockServer::start().await;
    let client = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/shared_domains"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![resource(
            "dom-1",
            json!({ "name": "cfapps.io" }),
        )])))
        .mount(&server)
        .await;

    let domain = client.get_default_domain().await.unwrap();
    assert_eq!(domain.name, "cfapps.io");
    assert_eq!(domain.guid, "dom-1");
}

#[tokio::test]
async fn test_rejected_credentials_are_authentication_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "authorization_endpoint": server.uri(),
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "unauthorized",
            "error_description": "Bad credentials",
        })))
        .mount(&server)
        .await;

    let client = CloudFoundryClient::new(&config(&server)).unwrap();
    let err = client.login().await.unwrap_err();

    assert!(matches!(err, PlatformError::Authentication(_)));
    // Rejected by the server, so neither a local setup nor a transport failure.
    assert!(!err.is_setup_error());
    assert!(!err.is_transport_error());
}

#[tokio::test]
async fn test_offerings_include_plans() {
    let server = MockServer::start().await;
    let client = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![
            resource(
                "svc-1",
                json!({ "label": "cleardb", "provider": null, "description": "MySQL" }),
            ),
            resource(
                "svc-2",
                json!({ "label": "elephantsql", "description": "PostgreSQL" }),
            ),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/services/svc-1/service_plans"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![
            resource("plan-1", json!({ "name": "spark", "service_guid": "svc-1" })),
            resource("plan-2", json!({ "name": "boost", "service_guid": "svc-1" })),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/services/svc-2/service_plans"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![])))
        .mount(&server)
        .await;

    let offerings = client.get_service_offerings().await.unwrap();

    assert_eq!(offerings.len(), 2);
    assert_eq!(offerings[0].label, "cleardb");
    let plans: Vec<_> = offerings[0].plans.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(plans, vec!["spark", "boost"]);
    assert!(offerings[1].plans.is_empty());
}

#[tokio::test]
async fn test_offerings_follow_next_url_across_pages() {
    let server = MockServer::start().await;
    let client = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/services"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![resource(
            "svc-2",
            json!({ "label": "elephantsql", "description": "PostgreSQL" }),
        )])))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_results": 2,
            "total_pages": 2,
            "next_url": "/v2/services?page=2",
            "resources": [resource(
                "svc-1",
                json!({ "label": "cleardb", "description": "MySQL" }),
            )],
        })))
        .expect(1)
        .mount(&server)
        .await;
    for guid in ["svc-1", "svc-2"] {
        Mock::given(method("GET"))
            .and(path(format!("/v2/services/{guid}/service_plans")))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![])))
            .mount(&server)
            .await;
    }

    let offerings = client.get_service_offerings().await.unwrap();

    let labels: Vec<_> = offerings.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels, vec!["cleardb", "elephantsql"]);
    assert_eq!(offerings[1].guid, "svc-2");
}

#[tokio::test]
async fn test_waiter_polls_summary_until_started() {
    let server = MockServer::start().await;
    let client = logged_in(&server).await;
    mount_app_lookup(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/apps/app-1/summary"))
        .respond_with(ResponseTemplate::new(200).set_body_json(summary("STOPPED")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/apps/app-1/summary"))
        .respond_with(ResponseTemplate::new(200).set_body_json(summary("STARTING")))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/apps/app-1/summary"))
        .respond_with(ResponseTemplate::new(200).set_body_json(summary("STARTED")))
        .mount(&server)
        .await;

    let app = LifecycleWaiter::new(Duration::from_millis(10))
        .wait_until_started(&client, "seaclouds_test-0")
        .await
        .unwrap();

    assert_eq!(app.state, AppState::Started);
    assert_eq!(app.uris, vec!["seaclouds_test-0.cfapps.io"]);
    assert_eq!(app.services, vec!["mysql-test"]);
    assert_eq!(app.running_instances, Some(1));

    let requests = server.received_requests().await.unwrap();
    let polls = requests
        .iter()
        .filter(|r| r.url.path() == "/v2/apps/app-1/summary")
        .count();
    let lookups = requests
        .iter()
        .filter(|r| r.url.path() == "/v2/spaces/space-1/apps")
        .count();
    assert_eq!(polls, 4);
    assert_eq!(lookups, 1);
}

#[tokio::test]
async fn test_server_error_while_polling_is_not_retried() {
    let server = MockServer::start().await;
    let client = logged_in(&server).await;
    mount_app_lookup(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/apps/app-1/summary"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error_code": "CF-ServiceUnavailable",
            "description": "try later",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = LifecycleWaiter::new(Duration::from_millis(10))
        .wait_until_started(&client, "seaclouds_test-0")
        .await
        .unwrap_err();

    match err {
        WaitError::Platform(PlatformError::Api { status, code, .. }) => {
            assert_eq!(status, 503);
            assert_eq!(code, "CF-ServiceUnavailable");
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_environment_fetch_and_verify() {
    let server = MockServer::start().await;
    let client = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/apps/app-1/env"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "staging_env_json": {},
            "running_env_json": {},
            "environment_json": {},
            "system_env_json": {
                "VCAP_SERVICES": {
                    "cleardb": [{ "name": "mysql-test", "label": "cleardb", "plan": "spark" }]
                }
            },
            "application_env_json": {
                "VCAP_APPLICATION": {
                    "application_name": "seaclouds_test-0",
                    "space_name": "development"
                }
            }
        })))
        .mount(&server)
        .await;

    let snapshot = client.get_application_environment("app-1").await.unwrap();

    verify_environment(
        &snapshot,
        &EnvironmentExpectations::new("cleardb", "seaclouds_test-0"),
    )
    .unwrap();
    assert!(verify_environment(
        &snapshot,
        &EnvironmentExpectations::new("ClearDB", "seaclouds_test-0"),
    )
    .is_err());
}

#[tokio::test]
async fn test_sweep_deletes_recursively() {
    let server = MockServer::start().await;
    let client = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/spaces/space-1/service_instances"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![resource(
            "si-1",
            json!({ "name": "mysql-test" }),
        )])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/spaces/space-1/apps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![resource(
            "app-1",
            json!({ "name": "seaclouds_test-0", "state": "STOPPED" }),
        )])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v2/service_instances/si-1"))
        .and(query_param("recursive", "true"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v2/apps/app-1"))
        .and(query_param("recursive", "true"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let report = paasprobe_lifecycle::sweep(&client).await;
    assert!(report.is_clean());
}
