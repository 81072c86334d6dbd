//! Application lifecycle checks for platform-as-a-service targets.
//!
//! - [`LifecycleWaiter`]: poll an application until it reports `STARTED`
//! - [`verify_environment`]: check the environment injected into an app
//! - [`find_offering`]: pick a marketplace offering by label
//! - [`Scenario`] and [`sweep`]: the end-to-end flow and its teardown
//!
//! # Invariants
//!
//! - An application is ready only when its observed state is exactly `STARTED`
//! - Fetch errors while polling are never retried
//! - Offering selection and verification never touch the network

pub mod config;
pub mod error;
pub mod offering;
pub mod scenario;
pub mod verify;
pub mod waiter;

pub use config::ScenarioConfig;
pub use error::{
    OfferingNotFound, ScenarioError, ScenarioFailure, Stage, StageExt, VerifyError, WaitError,
};
pub use offering::{find_offering, select_offering};
pub use scenario::{sweep, BindingMode, CleanupReport, Scenario, ScenarioReport};
pub use verify::{verify_environment, EnvironmentExpectations};
pub use waiter::{wait_until_started, LifecycleWaiter, DEFAULT_POLL_INTERVAL};
