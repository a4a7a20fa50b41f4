//! GCE API interaction module
//!
//! Everything that talks to Google Compute Engine: the metadata server for
//! access tokens and the resource views API for instance group membership.
//!
//! # Module Structure
//!
//! - [`auth`] - Access tokens from the metadata server, with caching
//! - [`http`] - HTTP client wrapper and proxy handling
//! - [`instance_groups`] - Instance group resolution and backend mapping
//!
//! # Example
//!
//! ```ignore
//! use gce_sd::gce::auth::{CredentialCache, MetadataTokenSource, SystemClock};
//! use gce_sd::gce::http::GceHttpClient;
//! use gce_sd::gce::instance_groups::{to_backends, GroupResolver};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let http = GceHttpClient::direct(None)?;
//!     let source = MetadataTokenSource::new(http.clone(), "http://metadata/computeMetadata/v1", "default");
//!     let mut cache = CredentialCache::new();
//!     let header = cache.ensure_valid(&source, &SystemClock).await?.header_value();
//!
//!     let resolver = GroupResolver::new(http, "https://www.googleapis.com", "my-project");
//!     let resources = resolver.resolve_group("us-central1-a", "web", &header).await?;
//!     let backends = to_backends(&resources);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod http;
pub mod instance_groups;
