//! Error types for platform client operations.

use thiserror::Error;

/// Errors returned by a [`PlatformClient`](crate::PlatformClient).
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The configured target endpoint is not a usable URL.
    #[error("the target URL is not valid: {0}")]
    InvalidTarget(String),

    /// Username or password was not provided.
    #[error("missing credentials: set CF_USER and CF_PASSWORD")]
    MissingCredentials,

    /// The authorization server rejected the credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// An operation was attempted before `login`.
    #[error("not logged in; call login() first")]
    NotLoggedIn,

    /// The platform answered with a non-success status.
    #[error("API error ({status}): {description}")]
    Api {
        status: u16,
        code: String,
        description: String,
    },

    /// A named resource does not exist in the target space.
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The platform answered with a body we could not interpret.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The upload source is not a prepared archive.
    #[error("unsupported application archive {path}: {reason}")]
    Archive { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlatformError {
    /// Create an API error from response details.
    pub fn api(status: u16, code: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Api {
            status,
            code: code.into(),
            description: description.into(),
        }
    }

    /// Create a not-found error for a resource kind.
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Returns true if this error was raised before any remote call was made.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTarget(_) | Self::MissingCredentials | Self::Archive { .. }
        )
    }

    /// Returns true if the failure happened on the wire or at the remote API.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Api { .. } | Self::Decode(_)
        )
    }
}

/// Convenience result alias for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;
