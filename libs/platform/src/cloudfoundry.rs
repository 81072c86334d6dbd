//! HTTP client for the Cloud Foundry v2 API.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::client::PlatformClient;
use crate::config::TargetConfig;
use crate::error::{PlatformError, PlatformResult};
use crate::types::{
    app_route, CloudApplication, Domain, EnvironmentSnapshot, ServiceInstance, ServiceOffering,
    ServicePlan, Staging,
};
use crate::wire::{
    ApiErrorBody, AppEntity, AppSummary, CreateApp, CreateRoute, CreateServiceBinding,
    CreateServiceInstance, Info, Metadata, NamedEntity, Page, Resource, ServiceEntity,
    ServiceInstanceEntity, ServicePlanEntity, TokenResponse, UpdateAppState,
};

/// OAuth client id used by the `cf` command-line tool.
const OAUTH_CLIENT_ID: &str = "cf";

/// Authenticated session state, populated by `login`.
#[derive(Debug, Clone)]
struct Session {
    token: String,
    space_guid: String,
}

/// Cloud Foundry v2 client bound to one org and space.
pub struct CloudFoundryClient {
    client: reqwest::Client,
    base_url: String,
    config: TargetConfig,
    session: RwLock<Option<Session>>,
    /// Application name -> GUID, so polling costs one request.
    app_guids: Mutex<HashMap<String, String>>,
}

impl CloudFoundryClient {
    /// Create a client for the configured target. No network traffic happens
    /// until [`PlatformClient::login`].
    pub fn new(config: &TargetConfig) -> PlatformResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .user_agent(concat!("paasprobe/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(config.http_timeout)
            .danger_accept_invalid_certs(config.trust_self_signed_certs)
            .build()?;

        Ok(Self {
            client,
            base_url: config.endpoint.as_str().trim_end_matches('/').to_string(),
            config: config.clone(),
            session: RwLock::new(None),
            app_guids: Mutex::new(HashMap::new()),
        })
    }

    /// Build a URL for an API path.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Build a URL with a `q=name:<name>` filter.
    fn name_query(&self, path: &str, name: &str) -> PlatformResult<Url> {
        Url::parse_with_params(&self.url(path), &[("q", format!("name:{name}"))])
            .map_err(|e| PlatformError::InvalidTarget(e.to_string()))
    }

    async fn session(&self) -> PlatformResult<Session> {
        self.session
            .read()
            .await
            .clone()
            .ok_or(PlatformError::NotLoggedIn)
    }

    /// Start an authenticated request.
    async fn request(
        &self,
        method: Method,
        url: impl reqwest::IntoUrl,
    ) -> PlatformResult<RequestBuilder> {
        let session = self.session().await?;
        Ok(self.client.request(method, url).bearer_auth(session.token))
    }

    /// Send a request and decode a JSON body.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> PlatformResult<T> {
        let response = request.send().await?;
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| PlatformError::Decode(e.to_string()))
    }

    /// Send a request and discard the body.
    async fn send_empty(&self, request: RequestBuilder) -> PlatformResult<()> {
        let response = request.send().await?;
        check_status(response).await.map(|_| ())
    }

    async fn get<T: DeserializeOwned>(&self, url: impl reqwest::IntoUrl) -> PlatformResult<T> {
        let request = self.request(Method::GET, url).await?;
        self.send(request).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> PlatformResult<T> {
        let request = self.request(Method::POST, self.url(path)).await?.json(body);
        self.send(request).await
    }

    async fn put<B: Serialize>(&self, path: &str, body: &B) -> PlatformResult<()> {
        let request = self.request(Method::PUT, self.url(path)).await?.json(body);
        self.send_empty(request).await
    }

    async fn delete(&self, path: &str) -> PlatformResult<()> {
        let request = self.request(Method::DELETE, self.url(path)).await?;
        self.send_empty(request).await
    }

    /// Fetch every page of a v2 list endpoint.
    async fn get_all<T: DeserializeOwned>(&self, first: Url) -> PlatformResult<Vec<Resource<T>>> {
        let mut resources = Vec::new();
        let mut page: Page<T> = self.get(first).await?;

        loop {
            resources.append(&mut page.resources);
            match page.next_url.take() {
                Some(next) => page = self.get(self.url(&next)).await?,
                None => break,
            }
        }

        Ok(resources)
    }

    /// Fetch the first resource matching a name filter.
    async fn find_by_name<T: DeserializeOwned>(
        &self,
        path: &str,
        name: &str,
    ) -> PlatformResult<Option<Resource<T>>> {
        let page: Page<T> = self.get(self.name_query(path, name)?).await?;
        Ok(page.resources.into_iter().next())
    }

    fn parse_url(&self, raw: &str) -> PlatformResult<Url> {
        Url::parse(raw).map_err(|e| PlatformError::InvalidTarget(e.to_string()))
    }

    /// Resolve an application name to its GUID.
    async fn app_guid(&self, name: &str) -> PlatformResult<String> {
        if let Some(guid) = self.app_guids.lock().await.get(name) {
            return Ok(guid.clone());
        }

        let space = self.session().await?.space_guid;
        let app = self
            .find_by_name::<NamedEntity>(&format!("/v2/spaces/{space}/apps"), name)
            .await?
            .ok_or_else(|| PlatformError::not_found("application", name))?;

        self.app_guids
            .lock()
            .await
            .insert(name.to_string(), app.metadata.guid.clone());
        Ok(app.metadata.guid)
    }

    async fn service_instance_guid(&self, name: &str) -> PlatformResult<String> {
        let space = self.session().await?.space_guid;
        self.find_by_name::<NamedEntity>(&format!("/v2/spaces/{space}/service_instances"), name)
            .await?
            .map(|r| r.metadata.guid)
            .ok_or_else(|| PlatformError::not_found("service", name))
    }

    /// Resolve the plan and offering label of a service instance.
    async fn describe_service_instance(
        &self,
        resource: Resource<ServiceInstanceEntity>,
    ) -> PlatformResult<ServiceInstance> {
        let mut label = String::new();
        let mut plan = String::new();

        if let Some(plan_guid) = &resource.entity.service_plan_guid {
            let plan_resource: Resource<ServicePlanEntity> = self
                .get(self.url(&format!("/v2/service_plans/{plan_guid}")))
                .await?;
            plan = plan_resource.entity.name;

            if let Some(service_guid) = &plan_resource.entity.service_guid {
                let service: Resource<ServiceEntity> = self
                    .get(self.url(&format!("/v2/services/{service_guid}")))
                    .await?;
                label = service.entity.label;
            }
        }

        Ok(ServiceInstance {
            guid: Some(resource.metadata.guid),
            name: resource.entity.name,
            label,
            plan,
        })
    }

    async fn service_plans(&self, service_guid: &str) -> PlatformResult<Vec<ServicePlan>> {
        let url = self
            .parse_url(&self.url(&format!("/v2/services/{service_guid}/service_plans")))?;
        let plans = self.get_all::<ServicePlanEntity>(url).await?;
        Ok(plans
            .into_iter()
            .map(|r| ServicePlan {
                guid: r.metadata.guid,
                name: r.entity.name,
            })
            .collect())
    }

    /// Find a shared domain GUID by name.
    async fn domain_guid(&self, domain_name: &str) -> PlatformResult<String> {
        self.find_by_name::<NamedEntity>("/v2/shared_domains", domain_name)
            .await?
            .map(|r| r.metadata.guid)
            .ok_or_else(|| PlatformError::not_found("domain", domain_name))
    }

    /// Create a route for `uri` and map it to the application.
    async fn add_route(&self, app_guid: &str, space_guid: &str, uri: &str) -> PlatformResult<()> {
        let (host, domain_name) = uri.split_once('.').ok_or_else(|| {
            PlatformError::api(400, "InvalidRoute", format!("route '{uri}' has no domain"))
        })?;
        let domain_guid = self.domain_guid(domain_name).await?;

        let route: Resource<serde_json::Value> = self
            .post(
                "/v2/routes",
                &CreateRoute {
                    host,
                    domain_guid: &domain_guid,
                    space_guid,
                },
            )
            .await?;

        debug!(uri, route_guid = %route.metadata.guid, "Mapping route");
        self.put(
            &format!("/v2/apps/{app_guid}/routes/{}", route.metadata.guid),
            &serde_json::json!({}),
        )
        .await
    }

    async fn bind_guids(&self, app_guid: &str, service_instance_guid: &str) -> PlatformResult<()> {
        let _: Resource<serde_json::Value> = self
            .post(
                "/v2/service_bindings",
                &CreateServiceBinding {
                    app_guid,
                    service_instance_guid,
                },
            )
            .await?;
        Ok(())
    }

    async fn set_state(&self, name: &str, state: &str) -> PlatformResult<()> {
        let guid = self.app_guid(name).await?;
        info!(app = name, state, "Updating application state");
        self.put(&format!("/v2/apps/{guid}"), &UpdateAppState { state })
            .await
    }

    async fn list_service_resources(
        &self,
    ) -> PlatformResult<Vec<Resource<ServiceInstanceEntity>>> {
        let space = self.session().await?.space_guid;
        let url = self
            .parse_url(&self.url(&format!("/v2/spaces/{space}/service_instances")))?;
        self.get_all(url).await
    }

    async fn list_app_resources(&self) -> PlatformResult<Vec<Resource<AppEntity>>> {
        let space = self.session().await?.space_guid;
        let url = self
            .parse_url(&self.url(&format!("/v2/spaces/{space}/apps")))?;
        self.get_all(url).await
    }
}

/// Map a non-success response to a [`PlatformError`].
async fn check_status(response: reqwest::Response) -> PlatformResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: ApiErrorBody = response.json().await.unwrap_or_default();
    let description = body
        .description
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());

    if status.as_u16() == 401 {
        return Err(PlatformError::Authentication(description));
    }

    Err(PlatformError::api(
        status.as_u16(),
        body.error_code.unwrap_or_else(|| "unknown".to_string()),
        description,
    ))
}

fn app_from_summary(summary: AppSummary) -> CloudApplication {
    CloudApplication {
        guid: summary.guid,
        name: summary.name,
        state: summary.state,
        staging: Staging {
            command: summary.command,
            buildpack: summary.buildpack,
        },
        memory_mb: summary.memory,
        instances: summary.instances,
        running_instances: summary.running_instances,
        uris: summary
            .routes
            .into_iter()
            .map(|r| app_route(&r.host, &r.domain.name))
            .collect(),
        services: summary.services.into_iter().map(|s| s.name).collect(),
    }
}

fn app_from_resource(metadata: Metadata, entity: AppEntity) -> CloudApplication {
    CloudApplication {
        guid: metadata.guid,
        name: entity.name,
        state: entity.state,
        staging: Staging {
            command: entity.command,
            buildpack: entity.buildpack,
        },
        memory_mb: entity.memory,
        instances: entity.instances,
        running_instances: None,
        uris: Vec::new(),
        services: Vec::new(),
    }
}

#[async_trait]
impl PlatformClient for CloudFoundryClient {
    async fn login(&self) -> PlatformResult<()> {
        let info: Info = self
            .send(self.client.get(self.url("/v2/info")))
            .await?;

        let token_base = info
            .token_endpoint
            .unwrap_or(info.authorization_endpoint);
        let token_url = format!("{}/oauth/token", token_base.trim_end_matches('/'));
        debug!(token_url = %token_url, "Requesting access token");

        let creds = &self.config.credentials;
        let response = self
            .client
            .post(&token_url)
            .basic_auth(OAUTH_CLIENT_ID, Some(""))
            .form(&[
                ("grant_type", "password"),
                ("username", creds.username.as_str()),
                ("password", creds.password.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 400 || status.as_u16() == 401 {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Authentication rejected");
            return Err(PlatformError::Authentication(format!(
                "{status}: {}",
                body.trim()
            )));
        }
        let token: TokenResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| PlatformError::Decode(e.to_string()))?;
        if let Some(kind) = &token.token_type {
            if !kind.eq_ignore_ascii_case("bearer") {
                return Err(PlatformError::Authentication(format!(
                    "unexpected token type '{kind}'"
                )));
            }
        }

        let org = self
            .client
            .get(self.name_query("/v2/organizations", &self.config.org)?)
            .bearer_auth(&token.access_token);
        let org: Page<NamedEntity> = self.send(org).await?;
        let org_guid = org
            .resources
            .into_iter()
            .next()
            .map(|r| r.metadata.guid)
            .ok_or_else(|| PlatformError::not_found("organization", &self.config.org))?;

        let space = self
            .client
            .get(self.name_query(
                &format!("/v2/organizations/{org_guid}/spaces"),
                &self.config.space,
            )?)
            .bearer_auth(&token.access_token);
        let space: Page<NamedEntity> = self.send(space).await?;
        let space_guid = space
            .resources
            .into_iter()
            .next()
            .map(|r| r.metadata.guid)
            .ok_or_else(|| PlatformError::not_found("space", &self.config.space))?;

        info!(
            endpoint = %self.base_url,
            org = %self.config.org,
            space = %self.config.space,
            "Logged in"
        );
        *self.session.write().await = Some(Session {
            token: token.access_token,
            space_guid,
        });
        Ok(())
    }

    async fn get_service_offerings(&self) -> PlatformResult<Vec<ServiceOffering>> {
        let url = self.parse_url(&self.url("/v2/services"))?;
        let services = self.get_all::<ServiceEntity>(url).await?;

        let mut offerings = Vec::with_capacity(services.len());
        for service in services {
            let plans = self.service_plans(&service.metadata.guid).await?;
            offerings.push(ServiceOffering {
                guid: service.metadata.guid,
                label: service.entity.label,
                provider: service.entity.provider,
                description: service.entity.description.unwrap_or_default(),
                plans,
            });
        }
        debug!(count = offerings.len(), "Fetched service offerings");
        Ok(offerings)
    }

    async fn create_service(&self, service: &ServiceInstance) -> PlatformResult<ServiceInstance> {
        let space = self.session().await?.space_guid;

        let offering = self
            .get_service_offerings()
            .await?
            .into_iter()
            .find(|o| o.label == service.label)
            .ok_or_else(|| PlatformError::not_found("service offering", &service.label))?;
        let plan = offering
            .plans
            .iter()
            .find(|p| p.name == service.plan)
            .ok_or_else(|| PlatformError::not_found("service plan", &service.plan))?;

        let created: Resource<ServiceInstanceEntity> = self
            .post(
                "/v2/service_instances",
                &CreateServiceInstance {
                    name: &service.name,
                    space_guid: &space,
                    service_plan_guid: &plan.guid,
                },
            )
            .await?;

        info!(
            service = %service.name,
            label = %offering.label,
            plan = %plan.name,
            "Created service instance"
        );
        Ok(ServiceInstance {
            guid: Some(created.metadata.guid),
            name: created.entity.name,
            label: offering.label,
            plan: plan.name.clone(),
        })
    }

    async fn get_service(&self, name: &str) -> PlatformResult<Option<ServiceInstance>> {
        let space = self.session().await?.space_guid;
        let found = self
            .find_by_name::<ServiceInstanceEntity>(
                &format!("/v2/spaces/{space}/service_instances"),
                name,
            )
            .await?;

        match found {
            Some(resource) => Ok(Some(self.describe_service_instance(resource).await?)),
            None => Ok(None),
        }
    }

    async fn list_services(&self) -> PlatformResult<Vec<ServiceInstance>> {
        let mut services = Vec::new();
        for resource in self.list_service_resources().await? {
            services.push(self.describe_service_instance(resource).await?);
        }
        Ok(services)
    }

    async fn delete_all_services(&self) -> PlatformResult<()> {
        for resource in self.list_service_resources().await? {
            info!(service = %resource.entity.name, "Deleting service instance");
            self.delete(&format!(
                "/v2/service_instances/{}?recursive=true",
                resource.metadata.guid
            ))
            .await?;
        }
        Ok(())
    }

    async fn get_default_domain(&self) -> PlatformResult<Domain> {
        let url = self.parse_url(&self.url("/v2/shared_domains"))?;
        let page: Page<NamedEntity> = self.get(url).await?;
        page.resources
            .into_iter()
            .next()
            .map(|r| Domain {
                guid: r.metadata.guid,
                name: r.entity.name,
            })
            .ok_or_else(|| PlatformError::not_found("domain", "default"))
    }

    async fn create_application(
        &self,
        name: &str,
        staging: &Staging,
        memory_mb: u32,
        uris: &[String],
        service_names: &[String],
    ) -> PlatformResult<CloudApplication> {
        let space = self.session().await?.space_guid;

        let created: Resource<AppEntity> = self
            .post(
                "/v2/apps",
                &CreateApp {
                    name,
                    space_guid: &space,
                    memory: memory_mb,
                    instances: 1,
                    command: staging.command.as_deref(),
                    buildpack: staging.buildpack.as_deref(),
                },
            )
            .await?;
        let app_guid = created.metadata.guid.clone();
        self.app_guids
            .lock()
            .await
            .insert(name.to_string(), app_guid.clone());
        info!(app = name, guid = %app_guid, memory_mb, "Created application");

        for uri in uris {
            self.add_route(&app_guid, &space, uri).await?;
        }
        for service_name in service_names {
            let instance_guid = self.service_instance_guid(service_name).await?;
            self.bind_guids(&app_guid, &instance_guid).await?;
        }

        let mut app = app_from_resource(created.metadata, created.entity);
        app.uris = uris.to_vec();
        app.services = service_names.to_vec();
        Ok(app)
    }

    async fn upload_application(&self, name: &str, archive: &Path) -> PlatformResult<()> {
        let display = archive.display().to_string();
        let is_zip = archive
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("zip"))
            .unwrap_or(false);
        if !is_zip || !archive.is_file() {
            return Err(PlatformError::Archive {
                path: display,
                reason: "expected an existing .zip file".to_string(),
            });
        }

        let guid = self.app_guid(name).await?;
        let bits = tokio::fs::read(archive).await?;
        debug!(app = name, bytes = bits.len(), "Uploading application bits");

        let part = Part::bytes(bits)
            .file_name("application.zip")
            .mime_str("application/zip")?;
        let form = Form::new().text("resources", "[]").part("application", part);

        let request = self
            .request(Method::PUT, self.url(&format!("/v2/apps/{guid}/bits")))
            .await?
            .multipart(form);
        self.send_empty(request).await
    }

    async fn start_application(&self, name: &str) -> PlatformResult<()> {
        self.set_state(name, "STARTED").await
    }

    async fn stop_application(&self, name: &str) -> PlatformResult<()> {
        self.set_state(name, "STOPPED").await
    }

    async fn get_application(&self, name: &str) -> PlatformResult<CloudApplication> {
        let guid = self.app_guid(name).await?;
        let summary: Result<AppSummary, _> = self
            .get(self.url(&format!("/v2/apps/{guid}/summary")))
            .await;

        match summary {
            Ok(summary) => Ok(app_from_summary(summary)),
            Err(PlatformError::Api { status: 404, .. }) => {
                // The cached GUID belonged to a deleted app.
                self.app_guids.lock().await.remove(name);
                Err(PlatformError::not_found("application", name))
            }
            Err(e) => Err(e),
        }
    }

    async fn list_applications(&self) -> PlatformResult<Vec<CloudApplication>> {
        Ok(self
            .list_app_resources()
            .await?
            .into_iter()
            .map(|r| app_from_resource(r.metadata, r.entity))
            .collect())
    }

    async fn delete_all_applications(&self) -> PlatformResult<()> {
        for resource in self.list_app_resources().await? {
            info!(app = %resource.entity.name, "Deleting application");
            self.delete(&format!("/v2/apps/{}?recursive=true", resource.metadata.guid))
                .await?;
        }
        self.app_guids.lock().await.clear();
        Ok(())
    }

    async fn get_application_environment(
        &self,
        app_guid: &str,
    ) -> PlatformResult<EnvironmentSnapshot> {
        let value: serde_json::Value = self
            .get(self.url(&format!("/v2/apps/{app_guid}/env")))
            .await?;
        match value {
            serde_json::Value::Object(map) => Ok(EnvironmentSnapshot::new(map)),
            other => Err(PlatformError::Decode(format!(
                "environment is not an object: {other}"
            ))),
        }
    }

    async fn bind_service(&self, app_name: &str, service_name: &str) -> PlatformResult<()> {
        let app_guid = self.app_guid(app_name).await?;
        let instance_guid = self.service_instance_guid(service_name).await?;
        info!(app = app_name, service = service_name, "Binding service");
        self.bind_guids(&app_guid, &instance_guid).await
    }
}
