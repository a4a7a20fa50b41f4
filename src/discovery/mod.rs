//! Instance group target discovery
//!
//! [`GceInstanceGroupProvider`] turns a job's configured instance groups into
//! labeled scrape targets. Each call to [`GceInstanceGroupProvider::targets`]
//! is one full discovery pass; scheduling repeated passes is up to the caller.

pub mod targets;

use crate::config::JobConfig;
use crate::error::{DiscoveryError, Result};
use crate::gce::auth::{Clock, CredentialCache, MetadataTokenSource, SystemClock};
use crate::gce::http::GceHttpClient;
use crate::gce::instance_groups::{to_backends, GroupResolver};
use crate::metrics::DiscoveryMetrics;
use crate::target::{LabelSet, Target};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

pub use targets::build_targets;

/// Discovers scrape targets for one job from its GCE instance groups
pub struct GceInstanceGroupProvider {
    job: JobConfig,
    global_labels: LabelSet,
    token_source: MetadataTokenSource,
    resolver: GroupResolver,
    clock: Arc<dyn Clock>,
    metrics: DiscoveryMetrics,

    /// Held across token refresh and the authorized request that follows
    credentials: Mutex<CredentialCache>,
    last_targets: RwLock<Vec<Target>>,
}

impl GceInstanceGroupProvider {
    pub fn new(job: JobConfig, global_labels: LabelSet, metrics: DiscoveryMetrics) -> Result<Self> {
        Self::with_clock(job, global_labels, metrics, Arc::new(SystemClock))
    }

    pub fn with_clock(
        job: JobConfig,
        global_labels: LabelSet,
        metrics: DiscoveryMetrics,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let gce = &job.gce_discovery;
        let timeout = gce.request_timeout();

        let metadata_http = GceHttpClient::direct(timeout).map_err(DiscoveryError::HttpClient)?;
        let api_http = GceHttpClient::with_proxy(gce.api_proxy_url.as_deref(), timeout)
            .map_err(DiscoveryError::HttpClient)?;

        let token_source =
            MetadataTokenSource::new(metadata_http, &gce.metadata_endpoint, &gce.service_account);
        let resolver = GroupResolver::new(api_http, &gce.api_endpoint, &gce.project);

        Ok(Self {
            job,
            global_labels,
            token_source,
            resolver,
            clock,
            metrics,
            credentials: Mutex::new(CredentialCache::new()),
            last_targets: RwLock::new(Vec::new()),
        })
    }

    pub fn metrics(&self) -> &DiscoveryMetrics {
        &self.metrics
    }

    /// Run a discovery pass over every configured instance group.
    ///
    /// The first failing group aborts the pass: nothing is returned for the
    /// groups that already succeeded and the previous snapshot is kept.
    pub async fn targets(&self) -> Result<Vec<Target>> {
        match self.discover().await {
            Ok(targets) => {
                *self.last_targets.write().await = targets.clone();
                Ok(targets)
            }
            Err(e) => {
                self.metrics.record_failure();
                Err(e)
            }
        }
    }

    /// Targets from the most recent successful pass
    pub async fn last_targets(&self) -> Vec<Target> {
        self.last_targets.read().await.clone()
    }

    async fn discover(&self) -> Result<Vec<Target>> {
        let mut targets = Vec::with_capacity(self.last_targets.read().await.len());

        for group in &self.job.gce_discovery.groups {
            let resources = self.resolve(&group.zone, &group.group_name).await.map_err(|e| {
                tracing::warn!("Failed to fetch backend list: {}", e);
                e
            })?;

            let backends = to_backends(&resources);
            self.metrics
                .record_backends(&group.zone, &group.group_name, backends.len());

            targets.extend(build_targets(group, &backends, &self.job, &self.global_labels));
        }

        tracing::debug!(
            "Discovered {} targets for job {}",
            targets.len(),
            self.job.name
        );
        Ok(targets)
    }

    async fn resolve(&self, zone: &str, group: &str) -> Result<Vec<String>> {
        let mut credentials = self.credentials.lock().await;
        let authorization = credentials
            .ensure_valid(&self.token_source, self.clock.as_ref())
            .await?
            .header_value();

        self.resolver
            .resolve_group(zone, group, &authorization)
            .await
            .map_err(|source| DiscoveryError::Resolution {
                zone: zone.to_string(),
                group: group.to_string(),
                source,
            })
    }
}
