//! Discovery metrics
//!
//! The instruments are plain handles owned by each provider. Registration into a
//! [`Registry`] happens once, by whoever owns the registry.

use prometheus::{IntCounter, IntGaugeVec, Opts, Registry};

const NAMESPACE: &str = "prometheus";

/// Failure counter and per-group backend gauge for one provider.
#[derive(Clone)]
pub struct DiscoveryMetrics {
    failures: IntCounter,
    backends: IntGaugeVec,
}

impl DiscoveryMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let failures = IntCounter::with_opts(
            Opts::new(
                "gce_discovery_failures_total",
                "The number of GCE backend service discovery failures.",
            )
            .namespace(NAMESPACE),
        )?;

        let backends = IntGaugeVec::new(
            Opts::new(
                "gce_targets",
                "Number of instances discovered for each instance group.",
            )
            .namespace(NAMESPACE),
            &["zone", "instance_group"],
        )?;

        Ok(Self { failures, backends })
    }

    /// Register both instruments. Fails if they are already registered.
    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.failures.clone()))?;
        registry.register(Box::new(self.backends.clone()))?;
        Ok(())
    }

    pub fn record_failure(&self) {
        self.failures.inc();
    }

    pub fn record_backends(&self, zone: &str, instance_group: &str, count: usize) {
        let count = i64::try_from(count).unwrap_or(i64::MAX);
        self.backends
            .with_label_values(&[zone, instance_group])
            .set(count);
    }

    pub fn failures(&self) -> u64 {
        self.failures.get()
    }

    pub fn backends(&self, zone: &str, instance_group: &str) -> i64 {
        self.backends.with_label_values(&[zone, instance_group]).get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Encoder, TextEncoder};

    #[test]
    fn registers_once_into_registry() {
        let registry = Registry::new();
        let metrics = DiscoveryMetrics::new().unwrap();
        metrics.register(&registry).unwrap();
        assert!(metrics.register(&registry).is_err());

        metrics.record_failure();
        metrics.record_backends("us-central1-a", "g1", 3);

        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buf)
            .unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("prometheus_gce_discovery_failures_total 1"));
        assert!(text.contains(
            "prometheus_gce_targets{instance_group=\"g1\",zone=\"us-central1-a\"} 3"
        ));
    }

    #[test]
    fn gauge_keeps_latest_count() {
        let metrics = DiscoveryMetrics::new().unwrap();
        metrics.record_backends("z", "g", 5);
        metrics.record_backends("z", "g", 2);
        assert_eq!(metrics.backends("z", "g"), 2);
        assert_eq!(metrics.failures(), 0);
    }
}
