//! Wait command.

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_output, print_success, OutputFormat};

use super::CommandContext;

/// Poll an application until it reports STARTED.
#[derive(Debug, Args)]
pub struct WaitCommand {
    /// Application name.
    app: String,

    /// Seconds between polls (defaults to CF_POLL_INTERVAL_SECS or 5).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,

    /// Give up after this many seconds (defaults to CF_MAX_WAIT_SECS, unbounded when unset).
    #[arg(long)]
    max_wait: Option<u64>,
}

#[derive(Debug, Serialize, Tabled)]
struct AppRow {
    #[tabled(rename = "Name")]
    name: String,

    #[tabled(rename = "GUID")]
    guid: String,

    #[tabled(rename = "State")]
    state: String,

    #[tabled(rename = "Instances")]
    instances: u32,

    #[tabled(rename = "Routes")]
    uris: String,

    #[tabled(rename = "Observed")]
    observed_at: String,
}

impl WaitCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let mut config = ctx.scenario.clone();
        if let Some(secs) = self.interval {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.max_wait {
            config.max_wait = Some(Duration::from_secs(secs));
        }

        let client = ctx.client().await?;
        let app = config.waiter().wait_until_started(&client, &self.app).await?;

        let row = AppRow {
            name: app.name,
            guid: app.guid,
            state: app.state.to_string(),
            instances: app.instances,
            uris: app.uris.join(", "),
            observed_at: Utc::now().to_rfc3339(),
        };
        match ctx.format {
            OutputFormat::Json => print_output(&[row], ctx.format),
            OutputFormat::Table => {
                print_success(&format!("'{}' is {}", row.name, row.state));
                print_output(&[row], ctx.format);
            }
        }
        Ok(())
    }
}
