//! Sweep command.

use anyhow::{bail, Result};
use clap::Args;
use paasprobe_lifecycle::sweep;
use paasprobe_platform::PlatformClient;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_output, print_success, OutputFormat};

use super::CommandContext;

/// Delete every service and application in the target space.
#[derive(Debug, Args)]
pub struct SweepCommand {
    /// Only list what would be deleted.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct ResourceRow {
    #[tabled(rename = "Kind")]
    kind: &'static str,

    #[tabled(rename = "Name")]
    name: String,

    #[tabled(rename = "Detail")]
    detail: String,
}

impl SweepCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let client = ctx.client().await?;

        if self.dry_run {
            print_output(&remaining(&client).await?, ctx.format);
            return Ok(());
        }

        sweep(&client).await.into_result()?;

        let left = remaining(&client).await?;
        if !left.is_empty() {
            print_output(&left, ctx.format);
            bail!("{} resource(s) remain after sweep", left.len());
        }

        if let OutputFormat::Table = ctx.format {
            print_success(&format!(
                "Space '{}' has no services or applications",
                ctx.target.space
            ));
        }
        Ok(())
    }
}

async fn remaining<C: PlatformClient + ?Sized>(client: &C) -> Result<Vec<ResourceRow>> {
    let services = client.list_services().await?;
    let apps = client.list_applications().await?;

    let rows = services
        .into_iter()
        .map(|s| ResourceRow {
            kind: "service",
            name: s.name,
            detail: format!("{} / {}", s.label, s.plan),
        })
        .chain(apps.into_iter().map(|a| ResourceRow {
            kind: "application",
            name: a.name,
            detail: a.state.to_string(),
        }))
        .collect();
    Ok(rows)
}
