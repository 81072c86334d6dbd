//! CLI commands.

mod env;
mod offerings;
mod run;
mod sweep;
mod wait;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use paasprobe_lifecycle::ScenarioConfig;
use paasprobe_platform::config::{DEFAULT_ENDPOINT, DEFAULT_ORG, DEFAULT_SPACE};
use paasprobe_platform::{CloudFoundryClient, Credentials, PlatformClient, PlatformError, TargetConfig};
use tracing::info;

use crate::output::OutputFormat;

/// paasprobe - Run lifecycle probes against a Cloud Foundry target.
#[derive(Debug, Parser)]
#[command(name = "paasprobe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (table or json).
    #[arg(long, global = true, default_value = "table")]
    format: String,

    /// Log level when RUST_LOG is unset.
    #[arg(long, global = true, env = "PAASPROBE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(flatten)]
    target: TargetArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Which account and space to use.
#[derive(Debug, Args)]
struct TargetArgs {
    /// API endpoint.
    #[arg(long, global = true, env = "CF_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Username.
    #[arg(long, global = true, env = "CF_USER")]
    user: Option<String>,

    /// Password.
    #[arg(long, global = true, env = "CF_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Organization name.
    #[arg(long, global = true, env = "CF_ORG", default_value = DEFAULT_ORG)]
    org: String,

    /// Space name.
    #[arg(long, global = true, env = "CF_SPACE", default_value = DEFAULT_SPACE)]
    space: String,

    /// Accept self-signed TLS certificates.
    #[arg(
        long,
        global = true,
        env = "CF_TRUST_SELF_SIGNED_CERTS",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    trust_self_signed_certs: bool,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, global = true, env = "CF_HTTP_TIMEOUT_SECS", default_value_t = 30)]
    http_timeout_secs: u64,
}

impl TargetArgs {
    fn to_config(&self) -> Result<TargetConfig, PlatformError> {
        let (Some(user), Some(password)) = (&self.user, &self.password) else {
            return Err(PlatformError::MissingCredentials);
        };

        let mut config = TargetConfig::new(&self.endpoint, Credentials::new(user, password))?;
        config.org = self.org.clone();
        config.space = self.space.clone();
        config.trust_self_signed_certs = self.trust_self_signed_certs;
        config.http_timeout = Duration::from_secs(self.http_timeout_secs.max(1));
        Ok(config)
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a sample scenario end to end, then sweep the space.
    Run(run::RunCommand),

    /// List marketplace service offerings.
    Offerings(offerings::OfferingsCommand),

    /// Wait until an application reports STARTED.
    Wait(wait::WaitCommand),

    /// Show (and optionally verify) an application's environment.
    Env(env::EnvCommand),

    /// Delete all services and applications in the space.
    Sweep(sweep::SweepCommand),

    /// Show CLI version.
    Version,
}

impl Cli {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn log_json(&self) -> bool {
        self.log_json
    }

    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        if let Commands::Version = self.command {
            println!("paasprobe {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }

        let ctx = CommandContext {
            target: self.target.to_config()?,
            scenario: ScenarioConfig::from_env()?,
            format: OutputFormat::parse(&self.format),
        };

        match self.command {
            Commands::Run(cmd) => cmd.run(ctx).await,
            Commands::Offerings(cmd) => cmd.run(ctx).await,
            Commands::Wait(cmd) => cmd.run(ctx).await,
            Commands::Env(cmd) => cmd.run(ctx).await,
            Commands::Sweep(cmd) => cmd.run(ctx).await,
            Commands::Version => Ok(()),
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub target: TargetConfig,
    pub scenario: ScenarioConfig,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Build a client and log in.
    pub async fn client(&self) -> Result<CloudFoundryClient> {
        let client = CloudFoundryClient::new(&self.target)?;
        client
            .login()
            .await
            .with_context(|| format!("Failed to log in to {}", self.target.endpoint))?;
        info!(org = %self.target.org, space = %self.target.space, "Session established");
        Ok(client)
    }
}
