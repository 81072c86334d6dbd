//! Environment verification.
//!
//! Checks, in order, that an environment snapshot exposes the bound service
//! under its offering label and names the expected application. Each check
//! is a precondition for the next, so the first failure is reported.

use paasprobe_platform::types::{
    APPLICATION_ENV_KEY, SYSTEM_ENV_KEY, VCAP_APPLICATION_KEY, VCAP_SERVICES_KEY,
};
use paasprobe_platform::EnvironmentSnapshot;
use serde_json::{Map, Value};

use crate::error::VerifyError;

/// Field of `VCAP_APPLICATION` holding the application name.
pub const APPLICATION_NAME_FIELD: &str = "application_name";

/// What a running application is expected to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentExpectations {
    /// Offering label the bound service is listed under (case-sensitive).
    pub service_label: String,

    /// Name the application was created with.
    pub application_name: String,
}

impl EnvironmentExpectations {
    pub fn new(service_label: impl Into<String>, application_name: impl Into<String>) -> Self {
        Self {
            service_label: service_label.into(),
            application_name: application_name.into(),
        }
    }
}

/// Verify a snapshot against the expectations.
pub fn verify_environment(
    snapshot: &EnvironmentSnapshot,
    expected: &EnvironmentExpectations,
) -> Result<(), VerifyError> {
    let root = snapshot.as_map();

    let system = mapping(root, SYSTEM_ENV_KEY, SYSTEM_ENV_KEY)?;
    let services = mapping(
        system,
        VCAP_SERVICES_KEY,
        &format!("{SYSTEM_ENV_KEY}.{VCAP_SERVICES_KEY}"),
    )?;
    if !services.contains_key(&expected.service_label) {
        return Err(VerifyError::ServiceLabelMissing {
            label: expected.service_label.clone(),
            available: services.keys().cloned().collect(),
        });
    }

    let application = mapping(root, APPLICATION_ENV_KEY, APPLICATION_ENV_KEY)?;
    let metadata = mapping(
        application,
        VCAP_APPLICATION_KEY,
        &format!("{APPLICATION_ENV_KEY}.{VCAP_APPLICATION_KEY}"),
    )?;

    match metadata.get(APPLICATION_NAME_FIELD) {
        Some(Value::String(name)) if *name == expected.application_name => Ok(()),
        other => Err(VerifyError::ApplicationNameMismatch {
            expected: expected.application_name.clone(),
            actual: other.map(|v| match v {
                Value::String(s) => s.clone(),
                v => v.to_string(),
            }),
        }),
    }
}

fn mapping<'a>(
    parent: &'a Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, VerifyError> {
    match parent.get(key) {
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(VerifyError::NotAMapping {
            path: path.to_string(),
        }),
        None => Err(VerifyError::MissingSection {
            path: path.to_string(),
        }),
    }
}
