//! Service discovery of scrape targets from GCE instance groups.
//!
//! # Module Structure
//!
//! - [`config`] - Job descriptors and global labels
//! - [`discovery`] - The per-job provider and target assembly
//! - [`error`] - Credential and resolution errors
//! - [`gce`] - Metadata server tokens and instance group API calls
//! - [`metrics`] - Failure counter and per-group backend gauge
//! - [`target`] - Scrape targets and label sets

pub mod config;
pub mod discovery;
pub mod error;
pub mod gce;
pub mod metrics;
pub mod target;

pub use config::{Config, GceDiscoveryConfig, GroupConfig, JobConfig};
pub use discovery::GceInstanceGroupProvider;
pub use error::{CredentialError, DiscoveryError, ResolutionError};
pub use metrics::DiscoveryMetrics;
pub use target::{LabelSet, Target};
