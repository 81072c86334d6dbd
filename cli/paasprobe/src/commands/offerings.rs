//! Marketplace commands.

use anyhow::Result;
use clap::Args;
use paasprobe_lifecycle::{select_offering, OfferingNotFound};
use paasprobe_platform::{PlatformClient, ServiceOffering};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_output, print_single, OutputFormat};

use super::CommandContext;

/// List service offerings.
#[derive(Debug, Args)]
pub struct OfferingsCommand {
    /// Show only the offering matching this label (ignoring case).
    #[arg(long)]
    label: Option<String>,
}

#[derive(Debug, Serialize, Tabled)]
struct OfferingRow {
    #[tabled(rename = "Label")]
    label: String,

    #[tabled(rename = "Provider", display = "display_option")]
    provider: Option<String>,

    #[tabled(rename = "Plans")]
    plans: String,

    #[tabled(rename = "Description")]
    description: String,
}

fn display_option(opt: &Option<String>) -> String {
    opt.as_deref().unwrap_or("-").to_string()
}

impl From<&ServiceOffering> for OfferingRow {
    fn from(offering: &ServiceOffering) -> Self {
        Self {
            label: offering.label.clone(),
            provider: offering.provider.clone(),
            plans: offering
                .plans
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            description: offering.description.clone(),
        }
    }
}

impl OfferingsCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let client = ctx.client().await?;
        let offerings = client.get_service_offerings().await?;
        let selected = select(&offerings, self.label.as_deref())?;

        match ctx.format {
            // Full offerings, including plan GUIDs.
            OutputFormat::Json => print_single(&selected),
            OutputFormat::Table => {
                let rows: Vec<OfferingRow> = selected.into_iter().map(OfferingRow::from).collect();
                print_output(&rows, ctx.format);
            }
        }
        Ok(())
    }
}

fn select<'a>(
    offerings: &'a [ServiceOffering],
    label: Option<&str>,
) -> Result<Vec<&'a ServiceOffering>, OfferingNotFound> {
    match label {
        Some(label) => Ok(vec![select_offering(offerings, label)?]),
        None => Ok(offerings.iter().collect()),
    }
}
