//! Domain types shared by every platform client implementation.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Runtime state of an application as reported by the platform.
///
/// Only the platform mutates this; clients observe it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AppState {
    Stopped,
    Starting,
    Started,
    /// Any value the platform reports that is not one of the above.
    Unknown(String),
}

impl AppState {
    /// Parse a wire value. Matching is exact: `"started"` is not `STARTED`.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "STOPPED" => Self::Stopped,
            "STARTING" => Self::Starting,
            "STARTED" => Self::Started,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stopped => "STOPPED",
            Self::Starting => "STARTING",
            Self::Started => "STARTED",
            Self::Unknown(value) => value,
        }
    }

    /// Returns true only for `STARTED`.
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started)
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AppState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AppState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_wire(&raw))
    }
}

/// Instructions used to prepare an application for execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staging {
    /// Start command (e.g. `node app.js`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Buildpack name or git URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buildpack: Option<String>,
}

impl Staging {
    pub fn command(command: impl Into<String>) -> Self {
        Self {
            command: Some(command.into()),
            buildpack: None,
        }
    }

    pub fn buildpack(buildpack: impl Into<String>) -> Self {
        Self {
            command: None,
            buildpack: Some(buildpack.into()),
        }
    }
}

/// An application known to the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudApplication {
    /// Platform-assigned GUID.
    pub guid: String,

    /// Name, unique within a space.
    pub name: String,

    /// Last observed runtime state.
    pub state: AppState,

    #[serde(default)]
    pub staging: Staging,

    /// Memory allocation in MB.
    pub memory_mb: u32,

    /// Desired instance count.
    pub instances: u32,

    /// Instances reported as running (when known).
    #[serde(default)]
    pub running_instances: Option<u32>,

    /// Route URIs (`host.domain`).
    #[serde(default)]
    pub uris: Vec<String>,

    /// Names of bound service instances.
    #[serde(default)]
    pub services: Vec<String>,
}

/// A plan belonging to a service offering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePlan {
    pub guid: String,
    pub name: String,
}

/// A catalog entry describing a provisionable managed service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub guid: String,
    pub label: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub plans: Vec<ServicePlan>,
}

/// A service instance, either requested or observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// Platform-assigned GUID; `None` for a not-yet-created request.
    #[serde(default)]
    pub guid: Option<String>,
    pub name: String,
    /// Offering label.
    pub label: String,
    /// Plan name.
    pub plan: String,
}

impl ServiceInstance {
    /// Describe a service instance to be created.
    pub fn request(
        name: impl Into<String>,
        label: impl Into<String>,
        plan: impl Into<String>,
    ) -> Self {
        Self {
            guid: None,
            name: name.into(),
            label: label.into(),
            plan: plan.into(),
        }
    }
}

/// A routing domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub guid: String,
    pub name: String,
}

/// Build the route URI for an application on a domain.
pub fn app_route(app_name: &str, domain_name: &str) -> String {
    format!("{app_name}.{domain_name}")
}

/// Environment the platform injects into a running application.
///
/// Values are scalars or nested mappings; the structure is kept as raw JSON
/// and inspected with [`EnvironmentSnapshot::section`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentSnapshot(Map<String, Value>);

/// Key of the system section holding service bindings.
pub const SYSTEM_ENV_KEY: &str = "system_env_json";
/// Key of the bound-services mapping inside the system section.
pub const VCAP_SERVICES_KEY: &str = "VCAP_SERVICES";
/// Key of the application section holding identity metadata.
pub const APPLICATION_ENV_KEY: &str = "application_env_json";
/// Key of the application metadata mapping inside the application section.
pub const VCAP_APPLICATION_KEY: &str = "VCAP_APPLICATION";

impl EnvironmentSnapshot {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Wrap a JSON value; anything but an object yields an empty snapshot.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    /// Top-level value for a key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Top-level value for a key, if it is a mapping.
    pub fn section(&self, key: &str) -> Option<&Map<String, Value>> {
        self.0.get(key).and_then(Value::as_object)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}
