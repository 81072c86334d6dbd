//! Error display for the CLI.

use colored::Colorize;
use paasprobe_lifecycle::{ScenarioError, ScenarioFailure, Stage};
use paasprobe_platform::PlatformError;

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    if let Some(scenario) = err.downcast_ref::<ScenarioError>() {
        eprintln!("\nFailed stage: {}", scenario.stage.as_str().bold());
        if let Some(hint) = stage_hint(scenario) {
            eprintln!("\n{}", hint.yellow());
        }
        return;
    }

    if let Some(platform) = err.downcast_ref::<PlatformError>() {
        if let Some(hint) = platform_hint(platform) {
            eprintln!("\n{}", hint.yellow());
        }
    }
}

fn stage_hint(err: &ScenarioError) -> Option<&'static str> {
    match (&err.stage, &err.source) {
        (_, ScenarioFailure::Platform(platform)) => platform_hint(platform),
        (Stage::Provisioning, ScenarioFailure::Offering(_)) => {
            Some("Hint: Check CF_MYSQL_LABEL against `paasprobe offerings`.")
        }
        (Stage::Polling, ScenarioFailure::Wait(wait)) if wait.is_timeout() => {
            Some("Hint: Raise --max-wait or check the app's staging logs.")
        }
        (Stage::Verification, ScenarioFailure::Verify(_)) => {
            Some("Hint: Inspect the snapshot with `paasprobe env <app>`.")
        }
        _ => None,
    }
}

fn platform_hint(err: &PlatformError) -> Option<&'static str> {
    match err {
        PlatformError::MissingCredentials | PlatformError::Authentication(_) => {
            Some("Hint: Set CF_USER and CF_PASSWORD (or --user/--password).")
        }
        PlatformError::InvalidTarget(_) => {
            Some("Hint: CF_ENDPOINT must be an http(s) URL, e.g. https://api.run.pivotal.io")
        }
        PlatformError::Network(_) => {
            Some("Hint: Check your network connection and API endpoint.")
        }
        PlatformError::Api { status: 403, .. } => {
            Some("Hint: You may not have permission in this org/space.")
        }
        PlatformError::Archive { .. } => {
            Some("Hint: Upload a prepared .zip archive of the application.")
        }
        _ => None,
    }
}
