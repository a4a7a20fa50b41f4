//! Scrape targets and label sets

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

pub const JOB_LABEL: &str = "job";
pub const ZONE_LABEL: &str = "zone";
pub const INSTANCE_GROUP_LABEL: &str = "instance_group";

/// Label name to value mapping. Inserting an existing name replaces its value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Copy every label of `other` into this set, overwriting on collision.
    pub fn merge(&mut self, other: &LabelSet) {
        for (name, value) in &other.0 {
            self.0.insert(name.clone(), value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A scrape endpoint with the labels to attach to its samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    endpoint: Url,
    #[serde(rename = "scrape_timeout_secs", serialize_with = "serialize_secs")]
    scrape_timeout: Duration,
    labels: LabelSet,
}

impl Target {
    pub fn new(endpoint: Url, scrape_timeout: Duration, labels: LabelSet) -> Self {
        Self {
            endpoint,
            scrape_timeout,
            labels,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn scrape_timeout(&self) -> Duration {
        self.scrape_timeout
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn into_labels(self) -> LabelSet {
        self.labels
    }
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_insert_overrides() {
        let mut labels = LabelSet::new();
        labels.insert("zone", "a");
        assert_eq!(labels.insert("zone", "b"), Some("a".to_string()));
        assert_eq!(labels.get("zone"), Some("b"));
        assert_eq!(labels.len(), 1);
    }

    #[test]
    fn merge_overwrites_existing_names() {
        let mut labels: LabelSet = [("job", "node"), ("env", "dev")].into_iter().collect();
        let global: LabelSet = [("env", "prod"), ("team", "infra")].into_iter().collect();
        labels.merge(&global);

        assert_eq!(labels.get("job"), Some("node"));
        assert_eq!(labels.get("env"), Some("prod"));
        assert_eq!(labels.get("team"), Some("infra"));
    }

    #[test]
    fn target_serializes_as_flat_json() {
        let target = Target::new(
            Url::parse("http://i-1:9100/metrics").unwrap(),
            Duration::from_millis(2500),
            [("job", "node")].into_iter().collect(),
        );
        let value = serde_json::to_value(&target).unwrap();
        assert_eq!(value["endpoint"], "http://i-1:9100/metrics");
        assert_eq!(value["scrape_timeout_secs"], 2.5);
        assert_eq!(value["labels"]["job"], "node");
    }
}
