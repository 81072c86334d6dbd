//! Scenario configuration (env-driven).

use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::waiter::{LifecycleWaiter, DEFAULT_POLL_INTERVAL};

/// Default offering label of the database service.
pub const DEFAULT_SERVICE_LABEL: &str = "cleardb";

/// Default plan of the database service.
pub const DEFAULT_SERVICE_PLAN: &str = "spark";

/// Default buildpack for the PHP sample.
pub const DEFAULT_BUILDPACK: &str = "https://github.com/cloudfoundry/php-buildpack.git";

/// Default memory allocation, in MB.
pub const DEFAULT_MEMORY_MB: u32 = 512;

/// Parameters of a scenario run that do not identify the target account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioConfig {
    /// Offering label to provision (matched ignoring case).
    pub service_label: String,

    /// Plan name to provision.
    pub service_plan: String,

    /// Buildpack used by buildpack-staged scenarios.
    pub buildpack: String,

    /// Memory allocation for the application, in MB.
    pub memory_mb: u32,

    /// Delay between state polls.
    pub poll_interval: Duration,

    /// Give up waiting after this long; `None` waits forever.
    pub max_wait: Option<Duration>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            service_label: DEFAULT_SERVICE_LABEL.to_string(),
            service_plan: DEFAULT_SERVICE_PLAN.to_string(),
            buildpack: DEFAULT_BUILDPACK.to_string(),
            memory_mb: DEFAULT_MEMORY_MB,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: None,
        }
    }
}

impl ScenarioConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let poll_interval_secs: Option<u64> = lookup("CF_POLL_INTERVAL_SECS")
            .map(|v| v.parse())
            .transpose()
            .context("CF_POLL_INTERVAL_SECS must be an integer (seconds).")?;
        if poll_interval_secs == Some(0) {
            bail!("CF_POLL_INTERVAL_SECS must be at least 1 second.");
        }

        let max_wait_secs: Option<u64> = lookup("CF_MAX_WAIT_SECS")
            .map(|v| v.parse())
            .transpose()
            .context("CF_MAX_WAIT_SECS must be an integer (seconds).")?;

        let memory_mb: Option<u32> = lookup("CF_MEMORY_MB")
            .map(|v| v.parse())
            .transpose()
            .context("CF_MEMORY_MB must be an integer (megabytes).")?;

        Ok(Self {
            service_label: lookup("CF_MYSQL_LABEL").unwrap_or(defaults.service_label),
            service_plan: lookup("CF_MYSQL_PLAN").unwrap_or(defaults.service_plan),
            buildpack: lookup("CF_BUILDPACK").unwrap_or(defaults.buildpack),
            memory_mb: memory_mb.unwrap_or(defaults.memory_mb),
            poll_interval: poll_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
            max_wait: max_wait_secs.map(Duration::from_secs),
        })
    }

    /// The waiter these settings describe.
    pub fn waiter(&self) -> LifecycleWaiter {
        let waiter = LifecycleWaiter::new(self.poll_interval);
        match self.max_wait {
            Some(limit) => waiter.with_max_wait(limit),
            None => waiter,
        }
    }
}
