//! GCE Authentication
//!
//! Access tokens come from the instance metadata server. Per:
//! https://cloud.google.com/compute/docs/access/authenticate-workloads

use super::http::GceHttpClient;
use crate::error::CredentialError;
use serde::Deserialize;
use std::time::{Duration, Instant};

/// Header the metadata server requires on every request
pub const METADATA_FLAVOR_HEADER: (&str, &str) = ("Metadata-Flavor", "Google");

/// Upper bound on a token lifetime, whatever the metadata server claims
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Source of the current time, replaceable in tests
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// {"access_token":"ya29.XAE9...","expires_in":3599,"token_type":"Bearer"}
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    expires_in: u64,
    #[serde(default)]
    token_type: String,
}

/// A bearer token and the instant it stops being usable
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub scheme: String,
    pub expires_at: Instant,
}

impl Credential {
    fn is_valid_at(&self, now: Instant) -> bool {
        !self.token.is_empty() && self.expires_at > now
    }

    /// Value for the `Authorization` header
    pub fn header_value(&self) -> String {
        format!("{} {}", self.scheme, self.token)
    }
}

/// Fetches tokens for one service account from the metadata server
#[derive(Clone)]
pub struct MetadataTokenSource {
    http: GceHttpClient,
    token_url: String,
}

impl MetadataTokenSource {
    pub fn new(http: GceHttpClient, metadata_endpoint: &str, service_account: &str) -> Self {
        let token_url = format!(
            "{}/instance/service-accounts/{}/token",
            metadata_endpoint.trim_end_matches('/'),
            urlencoding::encode(service_account)
        );
        Self { http, token_url }
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    async fn fetch(&self, clock: &dyn Clock) -> Result<Credential, CredentialError> {
        let response = self.http.get(&self.token_url, METADATA_FLAVOR_HEADER).await?;
        if !response.status.is_success() {
            return Err(CredentialError::Status {
                status: response.status,
            });
        }

        let token: TokenResponse = serde_json::from_str(&response.body).map_err(|e| {
            tracing::error!("Parse token response: {}", e);
            e
        })?;

        if token.access_token.is_empty() {
            return Err(CredentialError::EmptyToken);
        }

        tracing::info!(
            "Refreshed {} access token, expires in {} sec",
            token.token_type,
            token.expires_in
        );

        let lifetime = Duration::from_secs(token.expires_in).min(MAX_TOKEN_LIFETIME);
        let expires_at = clock
            .now()
            .checked_add(lifetime)
            .ok_or(CredentialError::InvalidExpiry {
                expires_in: token.expires_in,
            })?;

        Ok(Credential {
            token: token.access_token,
            scheme: token.token_type,
            expires_at,
        })
    }
}

/// Mutable token state. Not synchronized: the owner serializes access.
#[derive(Debug, Default)]
pub struct CredentialCache {
    current: Option<Credential>,
}

impl CredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure a usable credential is cached, fetching a new one if needed.
    ///
    /// Returns without I/O while the cached token has not expired. On failure
    /// the cache is left empty so the next call fetches again.
    pub async fn ensure_valid(
        &mut self,
        source: &MetadataTokenSource,
        clock: &dyn Clock,
    ) -> Result<&Credential, CredentialError> {
        let now = clock.now();
        if self.current.as_ref().is_some_and(|c| c.is_valid_at(now)) {
            tracing::trace!("Using cached access token");
        } else {
            self.current = None;
            self.current = Some(source.fetch(clock).await?);
        }

        match self.current.as_ref() {
            Some(credential) => Ok(credential),
            None => Err(CredentialError::EmptyToken),
        }
    }

    pub fn current(&self) -> Option<&Credential> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_url_includes_service_account() {
        let http = GceHttpClient::direct(None).unwrap();
        let source = MetadataTokenSource::new(
            http,
            "http://metadata/computeMetadata/v1/",
            "sa@proj.iam.gserviceaccount.com",
        );
        assert_eq!(
            source.token_url(),
            "http://metadata/computeMetadata/v1/instance/service-accounts/sa%40proj.iam.gserviceaccount.com/token"
        );
    }

    #[test]
    fn credential_expires_at_boundary() {
        let now = Instant::now();
        let credential = Credential {
            token: "abc".to_string(),
            scheme: "Bearer".to_string(),
            expires_at: now + Duration::from_secs(1),
        };
        assert!(credential.is_valid_at(now));
        assert!(!credential.is_valid_at(now + Duration::from_secs(1)));
        assert_eq!(credential.header_value(), "Bearer abc");
    }

    #[test]
    fn empty_token_is_never_valid() {
        let now = Instant::now();
        let credential = Credential {
            token: String::new(),
            scheme: "Bearer".to_string(),
            expires_at: now + Duration::from_secs(60),
        };
        assert!(!credential.is_valid_at(now));
    }
}
