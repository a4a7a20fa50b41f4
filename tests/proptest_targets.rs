//! Property-based tests using proptest
//!
//! These tests check backend name derivation and target assembly over
//! randomized resource URLs, label sets and instance names.

use gce_sd::discovery::build_targets;
use gce_sd::gce::instance_groups::{instance_name, to_backends};
use gce_sd::{GceDiscoveryConfig, GroupConfig, JobConfig, LabelSet};
use proptest::prelude::*;

/// Generate resource URLs of varying depth, including bare names
fn arb_resource() -> impl Strategy<Value = String> {
    (
        prop::collection::vec("[a-z0-9-]{1,12}", 0..6),
        "[a-z][a-z0-9-]{0,30}",
    )
        .prop_map(|(segments, name)| {
            if segments.is_empty() {
                name
            } else {
                format!("https://{}/{}", segments.join("/"), name)
            }
        })
}

fn arb_labels() -> impl Strategy<Value = LabelSet> {
    prop::collection::btree_map(
        prop_oneof![
            Just("job".to_string()),
            Just("zone".to_string()),
            Just("instance_group".to_string()),
            "[a-z_]{1,10}",
        ],
        "[a-z0-9]{0,10}",
        0..8,
    )
    .prop_map(|map| map.into_iter().collect())
}

fn job(port: u16, append_domain: Option<String>) -> JobConfig {
    JobConfig {
        name: "job1".to_string(),
        metrics_path: "/metrics".to_string(),
        scrape_timeout_secs: 10,
        gce_discovery: GceDiscoveryConfig {
            api_proxy_url: None,
            service_account: "default".to_string(),
            project: "p".to_string(),
            groups: vec![],
            port: Some(port),
            append_domain,
            metadata_endpoint: gce_sd::config::DEFAULT_METADATA_ENDPOINT.to_string(),
            api_endpoint: gce_sd::config::DEFAULT_API_ENDPOINT.to_string(),
            request_timeout_secs: None,
        },
    }
}

proptest! {
    /// The derived name is the final path segment and never contains a separator
    #[test]
    fn instance_name_is_final_segment(resource in arb_resource()) {
        let name = instance_name(&resource);
        prop_assert!(!name.contains('/'));
        prop_assert!(resource.ends_with(name));
        if !resource.contains('/') {
            prop_assert_eq!(name, resource.as_str());
        }
    }

    /// One backend per resource, order preserved
    #[test]
    fn backends_match_resources(resources in prop::collection::vec(arb_resource(), 0..50)) {
        let backends = to_backends(&resources);
        prop_assert_eq!(backends.len(), resources.len());
        for (backend, resource) in backends.iter().zip(&resources) {
            prop_assert_eq!(&backend.resource_url, resource);
        }
    }

    /// Zone and group always win; job name only when no global `job` label exists
    #[test]
    fn label_precedence_holds(
        global in arb_labels(),
        zone in "[a-z]+-[a-z]+[0-9]-[a-z]",
        group_name in "[a-z][a-z0-9-]{0,20}",
        names in prop::collection::vec("[a-z][a-z0-9-]{0,20}", 1..10),
    ) {
        let group = GroupConfig { zone: zone.clone(), group_name: group_name.clone() };
        let resources: Vec<String> = names.iter().map(|n| format!("zones/{}/instances/{}", zone, n)).collect();
        let targets = build_targets(&group, &to_backends(&resources), &job(9100, None), &global);

        prop_assert_eq!(targets.len(), names.len());
        for target in &targets {
            let labels = target.labels();
            prop_assert_eq!(labels.get("zone"), Some(zone.as_str()));
            prop_assert_eq!(labels.get("instance_group"), Some(group_name.as_str()));
            prop_assert_eq!(labels.get("job"), Some(global.get("job").unwrap_or("job1")));
            for (name, value) in global.iter() {
                if name != "zone" && name != "instance_group" {
                    prop_assert_eq!(labels.get(name), Some(value));
                }
            }
        }
    }

    /// Hosts are `name[.domain]:port`
    #[test]
    fn host_has_suffix_and_port(
        name in "[a-z][a-z0-9-]{0,20}",
        domain in prop::option::of("[a-z]{1,8}\\.[a-z]{2,3}"),
        port in 1u16..=u16::MAX,
    ) {
        let group = GroupConfig { zone: "z".to_string(), group_name: "g".to_string() };
        let targets = build_targets(&group, &to_backends(&[name.clone()]), &job(port, domain.clone()), &LabelSet::new());

        let expected = match &domain {
            Some(domain) => format!("http://{}.{}:{}/metrics", name, domain, port),
            None => format!("http://{}:{}/metrics", name, port),
        };
        // The url crate drops the default port
        let expected = expected.replace(":80/", "/");
        prop_assert_eq!(targets[0].endpoint().as_str(), expected.as_str());
    }
}
