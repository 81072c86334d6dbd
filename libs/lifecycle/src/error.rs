//! Error types for waiting, verification, and scenario runs.

use std::fmt;
use std::time::Duration;

use paasprobe_platform::{AppState, PlatformError};
use thiserror::Error;

/// Errors from [`LifecycleWaiter`](crate::LifecycleWaiter).
#[derive(Debug, Error)]
pub enum WaitError {
    /// Fetching the application failed. Never retried.
    #[error("failed to fetch application state: {0}")]
    Platform(#[from] PlatformError),

    /// A bounded wait gave up before observing `STARTED`.
    #[error(
        "application '{app}' not started after {waited:?} ({polls} polls, last state {last_state})"
    )]
    TimedOut {
        app: String,
        waited: Duration,
        polls: u32,
        last_state: AppState,
    },
}

impl WaitError {
    /// Returns true if the wait ended because of the configured bound.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// An environment snapshot did not contain what the application should see.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// A required section is absent.
    #[error("environment is missing '{path}'")]
    MissingSection { path: String },

    /// A section is present but is not a mapping.
    #[error("environment section '{path}' is not a mapping")]
    NotAMapping { path: String },

    /// No bound service is listed under the expected offering label.
    #[error("no bound service labelled '{label}' (found: {available:?})")]
    ServiceLabelMissing {
        label: String,
        available: Vec<String>,
    },

    /// The application metadata names a different application.
    #[error("application_name is {actual:?}, expected '{expected}'")]
    ApplicationNameMismatch {
        expected: String,
        actual: Option<String>,
    },
}

/// No marketplace offering carries the wanted label.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("no service offering labelled '{label}' (available: {available:?})")]
pub struct OfferingNotFound {
    pub label: String,
    pub available: Vec<String>,
}

/// Step of a scenario run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Setup,
    Provisioning,
    Deployment,
    Starting,
    Polling,
    Verification,
    Stopping,
    Cleanup,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Provisioning => "provisioning",
            Self::Deployment => "deployment",
            Self::Starting => "starting",
            Self::Polling => "polling",
            Self::Verification => "verification",
            Self::Stopping => "stopping",
            Self::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What went wrong inside a stage.
#[derive(Debug, Error)]
pub enum ScenarioFailure {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Wait(#[from] WaitError),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error(transparent)]
    Offering(#[from] OfferingNotFound),

    /// The service was created but could not be found afterwards.
    #[error("service '{name}' not found after creation")]
    ServiceMissing { name: String },
}

/// A scenario failed at a specific stage.
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct ScenarioError {
    pub stage: Stage,
    pub source: ScenarioFailure,
}

impl ScenarioError {
    pub fn new(stage: Stage, source: impl Into<ScenarioFailure>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }

    /// The verification error, if this run failed verification.
    pub fn verify_error(&self) -> Option<&VerifyError> {
        match &self.source {
            ScenarioFailure::Verify(e) => Some(e),
            _ => None,
        }
    }
}

/// Tag a failed result with the stage it happened in.
pub trait StageExt<T> {
    fn at_stage(self, stage: Stage) -> Result<T, ScenarioError>;
}

impl<T, E> StageExt<T> for Result<T, E>
where
    E: Into<ScenarioFailure>,
{
    fn at_stage(self, stage: Stage) -> Result<T, ScenarioError> {
        self.map_err(|e| ScenarioError::new(stage, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_error_names_stage() {
        let err = ScenarioError::new(
            Stage::Verification,
            VerifyError::MissingSection {
                path: "system_env_json".into(),
            },
        );
        assert_eq!(
            err.to_string(),
            "verification failed: environment is missing 'system_env_json'"
        );
        assert!(err.verify_error().is_some());
    }

    #[test]
    fn test_timeout_classification() {
        let err = WaitError::TimedOut {
            app: "a".into(),
            waited: Duration::from_secs(10),
            polls: 3,
            last_state: AppState::Starting,
        };
        assert!(err.is_timeout());
        assert!(!WaitError::from(PlatformError::NotLoggedIn).is_timeout());
    }
}
