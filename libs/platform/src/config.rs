//! Target configuration (env-driven).
//!
//! Settings are read once and passed explicitly to
//! [`CloudFoundryClient::new`](crate::CloudFoundryClient::new).

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;

use crate::error::PlatformError;

/// Default API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.run.pivotal.io";

/// Default organization.
pub const DEFAULT_ORG: &str = "rsucasas-org";

/// Default space.
pub const DEFAULT_SPACE: &str = "development";

/// Username and password for the password grant.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Which platform account and space to target.
#[derive(Debug, Clone)]
pub struct TargetConfig {
    /// API endpoint (example: https://api.run.pivotal.io).
    pub endpoint: Url,

    pub credentials: Credentials,

    /// Organization name.
    pub org: String,

    /// Space name within the organization.
    pub space: String,

    /// Accept self-signed TLS certificates.
    pub trust_self_signed_certs: bool,

    /// Per-request HTTP timeout.
    pub http_timeout: Duration,
}

impl TargetConfig {
    /// Build a config with defaults for everything but endpoint and credentials.
    pub fn new(endpoint: &str, credentials: Credentials) -> Result<Self, PlatformError> {
        Ok(Self {
            endpoint: parse_target_url(endpoint)?,
            credentials,
            org: DEFAULT_ORG.to_string(),
            space: DEFAULT_SPACE.to_string(),
            trust_self_signed_certs: true,
            http_timeout: Duration::from_secs(30),
        })
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup("CF_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let endpoint = parse_target_url(&endpoint)?;

        let username = lookup("CF_USER").filter(|v| !v.is_empty());
        let password = lookup("CF_PASSWORD").filter(|v| !v.is_empty());
        let credentials = match (username, password) {
            (Some(username), Some(password)) => Credentials { username, password },
            _ => return Err(PlatformError::MissingCredentials.into()),
        };

        let org = lookup("CF_ORG").unwrap_or_else(|| DEFAULT_ORG.to_string());
        let space = lookup("CF_SPACE").unwrap_or_else(|| DEFAULT_SPACE.to_string());

        let trust_self_signed_certs = lookup("CF_TRUST_SELF_SIGNED_CERTS")
            .map(|v| parse_bool(&v))
            .unwrap_or(true);

        let timeout_secs: u64 = lookup("CF_HTTP_TIMEOUT_SECS")
            .map(|v| v.parse())
            .transpose()
            .context("CF_HTTP_TIMEOUT_SECS must be an integer (seconds).")?
            .unwrap_or(30);

        Ok(Self {
            endpoint,
            credentials,
            org,
            space,
            trust_self_signed_certs,
            http_timeout: Duration::from_secs(timeout_secs.max(1)),
        })
    }
}

/// Parse and validate the API endpoint.
pub fn parse_target_url(target: &str) -> Result<Url, PlatformError> {
    let url = Url::parse(target).map_err(|e| PlatformError::InvalidTarget(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(PlatformError::InvalidTarget(format!(
            "unsupported scheme '{other}'"
        ))),
    }
}

/// Lenient boolean parsing; anything but `true`/`1` is false.
pub(crate) fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
