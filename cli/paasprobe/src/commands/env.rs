//! Environment command.

use anyhow::Result;
use clap::Args;
use paasprobe_lifecycle::{verify_environment, EnvironmentExpectations, Stage, StageExt};
use paasprobe_platform::PlatformClient;

use crate::output::{print_single, print_success, OutputFormat};

use super::CommandContext;

/// Show the environment injected into an application.
#[derive(Debug, Args)]
pub struct EnvCommand {
    /// Application name.
    app: String,

    /// Verify the snapshot lists this service label and names the app.
    #[arg(long)]
    label: Option<String>,
}

impl EnvCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let client = ctx.client().await?;
        let app = client.get_application(&self.app).await?;
        let snapshot = client.get_application_environment(&app.guid).await?;

        if let Some(label) = &self.label {
            let expected = EnvironmentExpectations::new(label, &app.name);
            verify_environment(&snapshot, &expected).at_stage(Stage::Verification)?;
            if let OutputFormat::Table = ctx.format {
                print_success(&format!("'{}' sees service '{}'", app.name, label));
            }
        }

        print_single(&snapshot);
        Ok(())
    }
}
