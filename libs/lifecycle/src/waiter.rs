//! Polling until an application reports `STARTED`.
//!
//! The loop fetches the application, returns as soon as the state is exactly
//! `STARTED`, and otherwise sleeps a fixed interval before fetching again.
//! There is no backoff. Fetch errors end the wait immediately; only
//! "not started yet" is retried.
//!
//! Without a `max_wait` the loop never gives up. Callers that need a bound
//! either configure one or wrap the future in `tokio::time::timeout`.

use std::time::Duration;

use paasprobe_platform::{CloudApplication, PlatformClient};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::error::WaitError;

/// Default delay between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Waits for an application to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleWaiter {
    poll_interval: Duration,
    max_wait: Option<Duration>,
}

impl Default for LifecycleWaiter {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: None,
        }
    }
}

impl LifecycleWaiter {
    /// An unbounded waiter polling every `poll_interval`.
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            max_wait: None,
        }
    }

    /// Give up with [`WaitError::TimedOut`] instead of sleeping past `max_wait`.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait
    }

    /// Poll `app_name` until its state is `STARTED` and return that descriptor.
    pub async fn wait_until_started<C>(
        &self,
        client: &C,
        app_name: &str,
    ) -> Result<CloudApplication, WaitError>
    where
        C: PlatformClient + ?Sized,
    {
        let started_at = Instant::now();
        let mut polls: u32 = 0;

        loop {
            let app = client.get_application(app_name).await?;
            polls = polls.saturating_add(1);

            if app.state.is_started() {
                info!(
                    app = app_name,
                    polls,
                    waited_ms = started_at.elapsed().as_millis() as u64,
                    "Application started"
                );
                return Ok(app);
            }

            debug!(app = app_name, state = %app.state, polls, "Application not started yet");

            if let Some(limit) = self.max_wait {
                let waited = started_at.elapsed();
                if waited + self.poll_interval > limit {
                    warn!(
                        app = app_name,
                        state = %app.state,
                        polls,
                        "Gave up waiting for application to start"
                    );
                    return Err(WaitError::TimedOut {
                        app: app_name.to_string(),
                        waited,
                        polls,
                        last_state: app.state,
                    });
                }
            }

            sleep(self.poll_interval).await;
        }
    }
}

/// Wait with the default interval and no bound.
pub async fn wait_until_started<C>(client: &C, app_name: &str) -> Result<CloudApplication, WaitError>
where
    C: PlatformClient + ?Sized,
{
    LifecycleWaiter::default()
        .wait_until_started(client, app_name)
        .await
}
