//! paasprobe - lifecycle probes for Cloud Foundry targets
//!
//! Provisions a database service, deploys a sample application bound to it,
//! waits until it is running, and checks the environment it was given.

use anyhow::Result;
use clap::Parser;

mod commands;
mod error;
mod logging;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level(), cli.log_json());

    if let Err(e) = cli.run().await {
        error::print_error(&e);
        std::process::exit(1);
    }

    Ok(())
}
