//! Discovery error taxonomy
//!
//! Credential failures and group resolution failures are kept apart so a caller
//! can tell a transport hiccup from a provider rejecting the request.

use thiserror::Error;

/// Failure to obtain an access token from the metadata server.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("metadata token request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("metadata server returned {status}")]
    Status { status: reqwest::StatusCode },

    #[error("failed to parse token response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("empty access token")]
    EmptyToken,

    #[error("token expiry of {expires_in} sec is out of range")]
    InvalidExpiry { expires_in: u64 },
}

impl CredentialError {
    /// Whether retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status } => status.is_server_error(),
            Self::Json(_) | Self::EmptyToken | Self::InvalidExpiry { .. } => false,
        }
    }
}

/// Failure to resolve an instance group into its member resources.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("instance group request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API request failed: {status}")]
    Status { status: reqwest::StatusCode },

    #[error("failed to parse instance group response: {0}")]
    Json(#[from] serde_json::Error),

    /// Error reported by the API inside the response body.
    #[error("{message}")]
    Provider { code: i64, message: String },
}

impl ResolutionError {
    /// Whether retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status } => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            Self::Provider { code, .. } => *code == 429 || *code >= 500,
            Self::Json(_) => false,
        }
    }
}

/// Error returned by a discovery pass.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("instance group {zone}/{group}: {source}")]
    Resolution {
        zone: String,
        group: String,
        #[source]
        source: ResolutionError,
    },

    #[error("failed to create HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

impl DiscoveryError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Credential(err) => err.is_transient(),
            Self::Resolution { source, .. } => source.is_transient(),
            Self::HttpClient(_) => false,
        }
    }
}

pub type Result<T, E = DiscoveryError> = std::result::Result<T, E>;
