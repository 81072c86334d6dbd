//! Scenario against a real Cloud Foundry target.
//!
//! Needs `CF_USER`, `CF_PASSWORD`, and a prepared sample archive in
//! `PAASPROBE_NODE_ARCHIVE`. Everything in the target space is deleted.
//!
//! ## Running
//!
//! ```bash
//! CF_USER=... CF_PASSWORD=... PAASPROBE_NODE_ARCHIVE=app.zip \
//!   cargo test -p paasprobe-e2e --test live -- --ignored
//! ```

use paasprobe_lifecycle::{sweep, Scenario, ScenarioConfig};
use paasprobe_platform::{CloudFoundryClient, PlatformClient, TargetConfig};

#[tokio::test]
#[ignore = "requires a Cloud Foundry account"]
async fn test_node_sample_against_live_target() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,paasprobe_platform=debug".into()),
        )
        .with_test_writer()
        .try_init();

    let target = TargetConfig::from_env().expect("CF_USER and CF_PASSWORD must be set");
    let config = ScenarioConfig::from_env().expect("invalid scenario settings");
    let archive = std::env::var("PAASPROBE_NODE_ARCHIVE")
        .expect("PAASPROBE_NODE_ARCHIVE must point at the sample .zip");

    let client = CloudFoundryClient::new(&target).unwrap();
    client.login().await.unwrap();

    let outcome = Scenario::node(&config, archive).run(&client).await;
    let cleanup = sweep(&client).await;

    let report = outcome.unwrap();
    tracing::info!(elapsed = ?report.elapsed, "Live scenario passed");
    cleanup.into_result().unwrap();

    assert!(client.list_services().await.unwrap().is_empty());
    assert!(client.list_applications().await.unwrap().is_empty());
}
