//! Instance group resolution
//!
//! Resolves a zonal instance group (a "resourceView" in the v1beta2 API) to the
//! URLs of its member instances.

use super::http::{sanitize_for_log, GceHttpClient};
use crate::error::ResolutionError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceGroupResponse {
    error: Option<ApiError>,
    #[serde(default)]
    resources: Vec<String>,
    self_link: Option<String>,
    size: Option<u64>,
}

/// One member of an instance group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    pub instance_name: String,
    pub resource_url: String,
}

/// Map resource URLs to backends, naming each after its last path segment
pub fn to_backends(resources: &[String]) -> Vec<Backend> {
    resources
        .iter()
        .map(|resource| Backend {
            instance_name: instance_name(resource).to_string(),
            resource_url: resource.clone(),
        })
        .collect()
}

/// The part of `resource` after its last `/`, or all of it if there is none
pub fn instance_name(resource: &str) -> &str {
    match resource.rfind('/') {
        Some(idx) => &resource[idx + 1..],
        None => resource,
    }
}

/// Builds instance group URLs for one project and fetches them
#[derive(Clone)]
pub struct GroupResolver {
    http: GceHttpClient,
    api_endpoint: String,
    project: String,
}

impl GroupResolver {
    pub fn new(http: GceHttpClient, api_endpoint: &str, project: &str) -> Self {
        Self {
            http,
            api_endpoint: api_endpoint.trim_end_matches('/').to_string(),
            project: project.to_string(),
        }
    }

    pub fn group_url(&self, zone: &str, group: &str) -> String {
        format!(
            "{}/resourceviews/v1beta2/projects/{}/zones/{}/resourceViews/{}",
            self.api_endpoint,
            urlencoding::encode(&self.project),
            urlencoding::encode(zone),
            urlencoding::encode(group)
        )
    }

    /// Fetch the member resource URLs of `zone/group`.
    ///
    /// An error embedded in the response body wins over the HTTP status, since
    /// the API reports some failures inside successful responses.
    pub async fn resolve_group(
        &self,
        zone: &str,
        group: &str,
        authorization: &str,
    ) -> Result<Vec<String>, ResolutionError> {
        let url = self.group_url(zone, group);
        let response = self.http.get(&url, ("Authorization", authorization)).await?;

        let parsed: InstanceGroupResponse = match serde_json::from_str(&response.body) {
            Ok(parsed) => parsed,
            Err(_) if !response.status.is_success() => {
                tracing::error!(
                    "API error: {} - {}",
                    response.status,
                    sanitize_for_log(&response.body)
                );
                return Err(ResolutionError::Status {
                    status: response.status,
                });
            }
            Err(e) => {
                tracing::error!("Parse instance group {}/{}: {}", zone, group, e);
                return Err(e.into());
            }
        };

        if let Some(error) = parsed.error.filter(|e| !e.message.is_empty()) {
            return Err(ResolutionError::Provider {
                code: error.code,
                message: error.message,
            });
        }

        if !response.status.is_success() {
            return Err(ResolutionError::Status {
                status: response.status,
            });
        }

        tracing::debug!(
            "Instance group {}/{} ({}) lists {} of {} resources",
            zone,
            group,
            parsed.self_link.as_deref().unwrap_or("-"),
            parsed.resources.len(),
            parsed.size.map_or_else(|| "?".to_string(), |s| s.to_string())
        );

        Ok(parsed.resources)
    }
}
