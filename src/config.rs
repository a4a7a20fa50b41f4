//! Configuration Management
//!
//! Job descriptors and global labels, loaded from a YAML file.

use crate::target::LabelSet;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_METADATA_ENDPOINT: &str = "http://metadata/computeMetadata/v1";
pub const DEFAULT_API_ENDPOINT: &str = "https://www.googleapis.com";

/// Top-level configuration file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Labels attached to every discovered target
    #[serde(default)]
    pub global_labels: LabelSet,
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

/// A scrape job backed by GCE instance group discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
    #[serde(default = "default_scrape_timeout_secs")]
    pub scrape_timeout_secs: u64,
    pub gce_discovery: GceDiscoveryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GceDiscoveryConfig {
    /// Proxy used for instance group API calls (not for the metadata server)
    #[serde(default)]
    pub api_proxy_url: Option<String>,
    #[serde(default = "default_service_account")]
    pub service_account: String,
    pub project: String,
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
    #[serde(default)]
    pub port: Option<u16>,
    /// Domain appended to instance names, e.g. `c.my-project.internal`
    #[serde(default)]
    pub append_domain: Option<String>,
    #[serde(default = "default_metadata_endpoint")]
    pub metadata_endpoint: String,
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub zone: String,
    pub group_name: String,
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_scrape_timeout_secs() -> u64 {
    10
}

fn default_service_account() -> String {
    "default".to_string()
}

fn default_metadata_endpoint() -> String {
    DEFAULT_METADATA_ENDPOINT.to_string()
}

fn default_api_endpoint() -> String {
    DEFAULT_API_ENDPOINT.to_string()
}

impl Config {
    /// Default config file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gce-sd").join("config.yaml"))
    }

    /// Load and validate configuration from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content).context("Failed to parse YAML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for job in &self.jobs {
            job.validate()?;
        }
        Ok(())
    }

    pub fn job(&self, name: &str) -> Option<&JobConfig> {
        self.jobs.iter().find(|j| j.name == name)
    }
}

impl JobConfig {
    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            anyhow::bail!("job name must not be empty");
        }
        let gce = &self.gce_discovery;
        if gce.project.is_empty() {
            anyhow::bail!("job {}: gce_discovery.project must not be empty", self.name);
        }
        if gce.groups.is_empty() {
            anyhow::bail!("job {}: no instance groups configured", self.name);
        }
        for group in &gce.groups {
            if group.zone.is_empty() || group.group_name.is_empty() {
                anyhow::bail!(
                    "job {}: instance group entries need both zone and group_name",
                    self.name
                );
            }
        }
        Ok(())
    }
}

impl GceDiscoveryConfig {
    /// The domain suffix to append to instance names, with its leading dot
    pub fn domain_suffix(&self) -> String {
        match self.append_domain.as_deref() {
            Some(domain) if !domain.is_empty() => format!(".{}", domain),
            _ => String::new(),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
