//! Target assembly for one instance group

use crate::config::{GroupConfig, JobConfig};
use crate::gce::instance_groups::Backend;
use crate::target::{LabelSet, Target, INSTANCE_GROUP_LABEL, JOB_LABEL, ZONE_LABEL};
use url::Url;

/// Labels shared by every target of `group`.
///
/// Later entries win: job name, then global labels, then zone and group.
pub fn group_labels(group: &GroupConfig, job: &JobConfig, global_labels: &LabelSet) -> LabelSet {
    let mut labels = LabelSet::new();
    labels.insert(JOB_LABEL, job.name.as_str());
    labels.merge(global_labels);
    labels.insert(ZONE_LABEL, group.zone.as_str());
    labels.insert(INSTANCE_GROUP_LABEL, group.group_name.as_str());
    labels
}

/// `instance_name[.domain][:port]`
pub fn backend_host(backend: &Backend, domain_suffix: &str, port: Option<u16>) -> String {
    match port {
        Some(port) => format!("{}{}:{}", backend.instance_name, domain_suffix, port),
        None => format!("{}{}", backend.instance_name, domain_suffix),
    }
}

/// One target per backend, each owning its own copy of the group labels.
///
/// Backends whose host does not form a valid URL are skipped with a warning.
pub fn build_targets(
    group: &GroupConfig,
    backends: &[Backend],
    job: &JobConfig,
    global_labels: &LabelSet,
) -> Vec<Target> {
    let labels = group_labels(group, job, global_labels);
    let gce = &job.gce_discovery;
    let domain_suffix = gce.domain_suffix();
    let path = if job.metrics_path.starts_with('/') {
        job.metrics_path.clone()
    } else {
        format!("/{}", job.metrics_path)
    };

    backends
        .iter()
        .filter_map(|backend| {
            let host = backend_host(backend, &domain_suffix, gce.port);
            match Url::parse(&format!("http://{}{}", host, path)) {
                Ok(endpoint) => Some(Target::new(endpoint, job.scrape_timeout(), labels.clone())),
                Err(e) => {
                    tracing::warn!(
                        "Skipping backend {} with invalid host {:?}: {}",
                        backend.resource_url,
                        host,
                        e
                    );
                    None
                }
            }
        })
        .collect()
}
