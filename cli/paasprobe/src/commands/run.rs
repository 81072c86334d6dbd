//! Scenario command.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use paasprobe_lifecycle::{sweep, Scenario, ScenarioReport};
use serde::Serialize;
use tracing::warn;

use crate::output::{print_info, print_single, print_success, OutputFormat};

use super::CommandContext;

/// Run a sample scenario.
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Which sample to deploy.
    #[arg(value_enum)]
    sample: Sample,

    /// Prepared .zip archive of the sample application.
    #[arg(long)]
    archive: PathBuf,

    /// Application name.
    #[arg(long)]
    app_name: Option<String>,

    /// Service instance name.
    #[arg(long)]
    service_name: Option<String>,

    /// Skip the environment check.
    #[arg(long)]
    no_verify: bool,

    /// Leave services and applications in place afterwards.
    #[arg(long)]
    keep: bool,

    /// Give up waiting for STARTED after this many seconds.
    #[arg(long)]
    max_wait: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Sample {
    /// Standalone Node.js app, service bound at creation.
    Node,
    /// PHP app staged with a buildpack, service bound afterwards.
    Php,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    app: String,
    service: String,
    label: String,
    plan: String,
    state: String,
    uris: Vec<String>,
    environment_checked: bool,
    elapsed_secs: f64,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl RunSummary {
    fn new(report: &ScenarioReport, started_at: DateTime<Utc>) -> Self {
        Self {
            app: report.application.name.clone(),
            service: report.service.name.clone(),
            label: report.service.label.clone(),
            plan: report.service.plan.clone(),
            state: report.application.state.to_string(),
            uris: report.application.uris.clone(),
            environment_checked: report.environment.is_some(),
            elapsed_secs: report.elapsed.as_secs_f64(),
            started_at,
            finished_at: Utc::now(),
        }
    }
}

impl RunCommand {
    fn scenario(&self, ctx: &CommandContext) -> Scenario {
        let config = &ctx.scenario;
        let mut scenario = match self.sample {
            Sample::Node => Scenario::node(config, self.archive.clone()),
            Sample::Php => Scenario::php(config, self.archive.clone()),
        };

        if let Some(name) = &self.app_name {
            scenario = scenario.with_app_name(name);
        }
        if let Some(name) = &self.service_name {
            scenario = scenario.with_service_name(name);
        }
        if self.no_verify {
            scenario = scenario.with_environment_check(false);
        }
        if let Some(secs) = self.max_wait {
            let waiter = config.waiter().with_max_wait(Duration::from_secs(secs));
            scenario = scenario.with_waiter(waiter);
        }
        scenario
    }

    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let scenario = self.scenario(&ctx);
        let client = ctx.client().await?;
        let started_at = Utc::now();

        print_info(&format!(
            "Deploying '{}' with {} service '{}' ({})",
            scenario.app_name, scenario.service_label, scenario.service_name, scenario.service_plan
        ));

        let outcome = scenario.run(&client).await;

        if self.keep {
            print_info("Leaving services and applications in place (--keep)");
        } else {
            let cleanup = sweep(&client).await;
            match (&outcome, cleanup.is_clean()) {
                (Ok(_), false) => cleanup.into_result()?,
                (Err(_), false) => warn!("Cleanup after failed scenario was incomplete"),
                _ => {}
            }
        }

        let report = outcome?;
        let summary = RunSummary::new(&report, started_at);
        match ctx.format {
            OutputFormat::Json => print_single(&summary),
            OutputFormat::Table => print_success(&format!(
                "'{}' reached {} in {:.1}s",
                summary.app, summary.state, summary.elapsed_secs
            )),
        }
        Ok(())
    }
}
