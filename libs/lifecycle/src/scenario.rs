//! End-to-end scenario runner.
//!
//! A scenario provisions a database service, deploys an application bound to
//! it, starts the application, waits for `STARTED`, and checks the injected
//! environment. The application is always stopped once it was created, and
//! [`sweep`] removes every service and application afterwards.

use std::path::PathBuf;
use std::time::Duration;

use paasprobe_platform::{
    app_route, CloudApplication, EnvironmentSnapshot, PlatformClient, PlatformError,
    ServiceInstance, Staging,
};
use tokio::time::Instant;
use tracing::{info, warn, Instrument};

use crate::config::ScenarioConfig;
use crate::error::{ScenarioError, ScenarioFailure, Stage, StageExt};
use crate::offering::select_offering;
use crate::verify::{verify_environment, EnvironmentExpectations};
use crate::waiter::LifecycleWaiter;

/// Application name used by the sample scenarios.
pub const DEFAULT_APP_NAME: &str = "seaclouds_test-0";

/// Service instance name used by the sample scenarios.
pub const DEFAULT_SERVICE_NAME: &str = "mysql-test";

/// Start command of the Node sample.
pub const NODE_START_COMMAND: &str = "node app.js";

/// How the service gets bound to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingMode {
    /// Pass the service name to `create_application`.
    AtCreate,
    /// Create the application unbound, then call `bind_service`.
    Explicit,
}

/// One end-to-end run against a platform.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub app_name: String,
    pub service_name: String,
    pub service_label: String,
    pub service_plan: String,
    pub staging: Staging,
    pub memory_mb: u32,
    /// Prepared `.zip` archive to upload.
    pub archive: PathBuf,
    pub binding: BindingMode,
    /// Check the environment snapshot after start.
    pub verify_environment: bool,
    pub waiter: LifecycleWaiter,
}

/// What a successful run observed.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub service: ServiceInstance,
    /// Descriptor returned by the waiter; its state is `STARTED`.
    pub application: CloudApplication,
    /// Snapshot that passed verification, when verification ran.
    pub environment: Option<EnvironmentSnapshot>,
    pub elapsed: Duration,
}

impl Scenario {
    /// Node sample: start command staging, service bound at creation,
    /// environment verified.
    pub fn node(config: &ScenarioConfig, archive: impl Into<PathBuf>) -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            service_label: config.service_label.clone(),
            service_plan: config.service_plan.clone(),
            staging: Staging::command(NODE_START_COMMAND),
            memory_mb: config.memory_mb,
            archive: archive.into(),
            binding: BindingMode::AtCreate,
            verify_environment: true,
            waiter: config.waiter(),
        }
    }

    /// PHP sample: buildpack staging, service bound after creation, only the
    /// start is checked.
    pub fn php(config: &ScenarioConfig, archive: impl Into<PathBuf>) -> Self {
        Self {
            staging: Staging::buildpack(config.buildpack.clone()),
            binding: BindingMode::Explicit,
            verify_environment: false,
            ..Self::node(config, archive)
        }
    }

    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn with_environment_check(mut self, enabled: bool) -> Self {
        self.verify_environment = enabled;
        self
    }

    pub fn with_waiter(mut self, waiter: LifecycleWaiter) -> Self {
        self.waiter = waiter;
        self
    }

    /// The expectations used for environment verification.
    pub fn expectations(&self) -> EnvironmentExpectations {
        EnvironmentExpectations::new(&self.service_label, &self.app_name)
    }

    /// Create the database service from the offering matching the label.
    pub async fn provision<C>(&self, client: &C) -> Result<ServiceInstance, ScenarioError>
    where
        C: PlatformClient + ?Sized,
    {
        let offerings = client
            .get_service_offerings()
            .await
            .at_stage(Stage::Provisioning)?;
        let offering =
            select_offering(&offerings, &self.service_label).at_stage(Stage::Provisioning)?;

        let request =
            ServiceInstance::request(&self.service_name, &offering.label, &self.service_plan);
        client
            .create_service(&request)
            .await
            .at_stage(Stage::Provisioning)?;

        let service = client
            .get_service(&self.service_name)
            .await
            .at_stage(Stage::Provisioning)?
            .ok_or_else(|| {
                ScenarioError::new(
                    Stage::Provisioning,
                    ScenarioFailure::ServiceMissing {
                        name: self.service_name.clone(),
                    },
                )
            })?;

        info!(
            service = %service.name,
            label = %offering.label,
            plan = %self.service_plan,
            "Service provisioned"
        );
        Ok(service)
    }

    /// Provision, deploy, start, wait, verify, and stop.
    pub async fn run<C>(&self, client: &C) -> Result<ScenarioReport, ScenarioError>
    where
        C: PlatformClient + ?Sized,
    {
        let span = tracing::info_span!("scenario", app = %self.app_name);
        self.run_inner(client).instrument(span).await
    }

    async fn run_inner<C>(&self, client: &C) -> Result<ScenarioReport, ScenarioError>
    where
        C: PlatformClient + ?Sized,
    {
        let started_at = Instant::now();
        let service = self.provision(client).await?;
        self.create_application(client).await?;

        let outcome = self.launch(client).await;
        let stopped = client.stop_application(&self.app_name).await;

        let (application, environment) = match (outcome, stopped) {
            (Ok(launched), Ok(())) => launched,
            (Ok(_), Err(e)) => return Err(ScenarioError::new(Stage::Stopping, e)),
            (Err(e), Err(stop_error)) => {
                warn!(error = %stop_error, "Failed to stop application after earlier failure");
                return Err(e);
            }
            (Err(e), Ok(())) => return Err(e),
        };

        let elapsed = started_at.elapsed();
        info!(elapsed_ms = elapsed.as_millis() as u64, "Scenario passed");
        Ok(ScenarioReport {
            service,
            application,
            environment,
            elapsed,
        })
    }

    async fn create_application<C>(&self, client: &C) -> Result<CloudApplication, ScenarioError>
    where
        C: PlatformClient + ?Sized,
    {
        let domain = client
            .get_default_domain()
            .await
            .at_stage(Stage::Deployment)?;
        let uris = vec![app_route(&self.app_name, &domain.name)];
        let services = match self.binding {
            BindingMode::AtCreate => vec![self.service_name.clone()],
            BindingMode::Explicit => Vec::new(),
        };

        client
            .create_application(
                &self.app_name,
                &self.staging,
                self.memory_mb,
                &uris,
                &services,
            )
            .await
            .at_stage(Stage::Deployment)?;

        // The app must be visible by name before bits go up.
        let app = client
            .get_application(&self.app_name)
            .await
            .at_stage(Stage::Deployment)?;
        info!(app = %app.name, uris = ?uris, "Application created");
        Ok(app)
    }

    /// Everything between creation and stop.
    async fn launch<C>(
        &self,
        client: &C,
    ) -> Result<(CloudApplication, Option<EnvironmentSnapshot>), ScenarioError>
    where
        C: PlatformClient + ?Sized,
    {
        if self.binding == BindingMode::Explicit {
            client
                .bind_service(&self.app_name, &self.service_name)
                .await
                .at_stage(Stage::Deployment)?;
        }

        client
            .upload_application(&self.app_name, &self.archive)
            .await
            .at_stage(Stage::Deployment)?;

        client
            .start_application(&self.app_name)
            .await
            .at_stage(Stage::Starting)?;

        let app = self
            .waiter
            .wait_until_started(client, &self.app_name)
            .await
            .at_stage(Stage::Polling)?;

        if !self.verify_environment {
            return Ok((app, None));
        }

        let environment = client
            .get_application_environment(&app.guid)
            .await
            .at_stage(Stage::Verification)?;
        verify_environment(&environment, &self.expectations())
            .at_stage(Stage::Verification)?;
        info!(app = %app.name, "Environment verified");

        Ok((app, Some(environment)))
    }
}

/// Outcome of a best-effort [`sweep`].
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub services_error: Option<PlatformError>,
    pub applications_error: Option<PlatformError>,
}

impl CleanupReport {
    /// Both deletions succeeded.
    pub fn is_clean(&self) -> bool {
        self.services_error.is_none() && self.applications_error.is_none()
    }

    /// The first failure, tagged with the cleanup stage.
    pub fn into_result(self) -> Result<(), ScenarioError> {
        match self.services_error.or(self.applications_error) {
            Some(e) => Err(ScenarioError::new(Stage::Cleanup, e)),
            None => Ok(()),
        }
    }
}

/// Delete all services, then all applications. Each deletion is attempted
/// exactly once regardless of the other's outcome.
pub async fn sweep<C>(client: &C) -> CleanupReport
where
    C: PlatformClient + ?Sized,
{
    let mut report = CleanupReport::default();

    if let Err(e) = client.delete_all_services().await {
        warn!(error = %e, "Failed to delete services");
        report.services_error = Some(e);
    }
    if let Err(e) = client.delete_all_applications().await {
        warn!(error = %e, "Failed to delete applications");
        report.applications_error = Some(e);
    }

    if report.is_clean() {
        info!("Swept all services and applications");
    }
    report
}
