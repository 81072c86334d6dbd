//! Platform client for Cloud Foundry style platforms.
//!
//! This crate provides:
//! - [`PlatformClient`]: the operations the lifecycle harness needs
//! - [`CloudFoundryClient`]: an HTTP implementation against the v2 API
//! - [`InMemoryPlatform`]: a deterministic in-process implementation
//! - [`TargetConfig`]: endpoint, credentials, org and space selection

pub mod client;
pub mod cloudfoundry;
pub mod config;
pub mod error;
pub mod memory;
pub mod types;

mod wire;

pub use client::PlatformClient;
pub use cloudfoundry::CloudFoundryClient;
pub use config::{Credentials, TargetConfig};
pub use error::{PlatformError, PlatformResult};
pub use memory::{InMemoryPlatform, Operation};
pub use types::{
    app_route, AppState, CloudApplication, Domain, EnvironmentSnapshot, ServiceInstance,
    ServiceOffering, ServicePlan, Staging,
};
