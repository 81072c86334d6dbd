//! The platform client interface.
//!
//! Everything the lifecycle crate does against a remote platform goes through
//! this trait:
//! - Session establishment
//! - Service catalog and service instances
//! - Application lifecycle and environment introspection
//!
//! [`CloudFoundryClient`](crate::CloudFoundryClient) talks to a real endpoint;
//! [`InMemoryPlatform`](crate::InMemoryPlatform) is used in tests.

use std::path::Path;

use async_trait::async_trait;

use crate::error::PlatformResult;
use crate::types::{
    CloudApplication, Domain, EnvironmentSnapshot, ServiceInstance, ServiceOffering, Staging,
};

/// Operations a platform-as-a-service client must provide.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Establish an authenticated session.
    async fn login(&self) -> PlatformResult<()>;

    /// List the service offerings in the marketplace, in platform order.
    async fn get_service_offerings(&self) -> PlatformResult<Vec<ServiceOffering>>;

    /// Create a service instance with the given label and plan.
    async fn create_service(&self, service: &ServiceInstance) -> PlatformResult<ServiceInstance>;

    /// Look up a service instance by name.
    async fn get_service(&self, name: &str) -> PlatformResult<Option<ServiceInstance>>;

    /// List all service instances in the target space.
    async fn list_services(&self) -> PlatformResult<Vec<ServiceInstance>>;

    /// Delete every service instance in the target space.
    async fn delete_all_services(&self) -> PlatformResult<()>;

    /// The domain new routes are created on.
    async fn get_default_domain(&self) -> PlatformResult<Domain>;

    /// Create an application with routes and (optionally) bound services.
    async fn create_application(
        &self,
        name: &str,
        staging: &Staging,
        memory_mb: u32,
        uris: &[String],
        service_names: &[String],
    ) -> PlatformResult<CloudApplication>;

    /// Upload a prepared `.zip` archive as the application's bits.
    async fn upload_application(&self, name: &str, archive: &Path) -> PlatformResult<()>;

    /// Request that the application be started. Does not wait.
    async fn start_application(&self, name: &str) -> PlatformResult<()>;

    /// Request that the application be stopped.
    async fn stop_application(&self, name: &str) -> PlatformResult<()>;

    /// Fetch the current descriptor, including runtime state.
    async fn get_application(&self, name: &str) -> PlatformResult<CloudApplication>;

    /// List all applications in the target space.
    async fn list_applications(&self) -> PlatformResult<Vec<CloudApplication>>;

    /// Delete every application in the target space.
    async fn delete_all_applications(&self) -> PlatformResult<()>;

    /// Fetch the environment injected into an application, by GUID.
    async fn get_application_environment(
        &self,
        app_guid: &str,
    ) -> PlatformResult<EnvironmentSnapshot>;

    /// Bind an existing service instance to an application.
    async fn bind_service(&self, app_name: &str, service_name: &str) -> PlatformResult<()>;
}
