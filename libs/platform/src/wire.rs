//! Cloud Foundry v2 wire structures.
//!
//! Every v2 list endpoint returns a page of `{metadata, entity}` resources.

use serde::{Deserialize, Serialize};

use crate::types::AppState;

#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(default)]
    pub next_url: Option<String>,
    #[serde(default = "Vec::new")]
    pub resources: Vec<Resource<T>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Resource<T> {
    pub metadata: Metadata,
    pub entity: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Metadata {
    pub guid: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Info {
    pub authorization_endpoint: String,
    #[serde(default)]
    pub token_endpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NamedEntity {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServiceEntity {
    pub label: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServicePlanEntity {
    pub name: String,
    #[serde(default)]
    pub service_guid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServiceInstanceEntity {
    pub name: String,
    #[serde(default)]
    pub service_plan_guid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppEntity {
    pub name: String,
    pub state: AppState,
    #[serde(default)]
    pub memory: u32,
    #[serde(default)]
    pub instances: u32,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub buildpack: Option<String>,
}

/// Body of `GET /v2/apps/:guid/summary`.
#[derive(Debug, Deserialize)]
pub(crate) struct AppSummary {
    pub guid: String,
    pub name: String,
    pub state: AppState,
    #[serde(default)]
    pub memory: u32,
    #[serde(default)]
    pub instances: u32,
    #[serde(default)]
    pub running_instances: Option<u32>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub buildpack: Option<String>,
    #[serde(default)]
    pub routes: Vec<SummaryRoute>,
    #[serde(default)]
    pub services: Vec<NamedEntity>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummaryRoute {
    pub host: String,
    pub domain: NamedEntity,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateApp<'a> {
    pub name: &'a str,
    pub space_guid: &'a str,
    pub memory: u32,
    pub instances: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buildpack: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateAppState<'a> {
    pub state: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateRoute<'a> {
    pub host: &'a str,
    pub domain_guid: &'a str,
    pub space_guid: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateServiceInstance<'a> {
    pub name: &'a str,
    pub space_guid: &'a str,
    pub service_plan_guid: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateServiceBinding<'a> {
    pub app_guid: &'a str,
    pub service_instance_guid: &'a str,
}

/// v2 error body.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
