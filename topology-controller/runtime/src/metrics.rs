use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{
        counter::Counter,
        family::Family,
        histogram::{exponential_buckets, Histogram},
    },
    registry::Registry,
};
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct TopologyMetrics {
    lookups: Family<ResultLabels, Counter>,
    write_errors: Counter,
    builds: Family<ResultLabels, Counter>,
    build_duration: Histogram,
}

#[derive(Clone, Hash, PartialEq, Eq, EncodeLabelSet, Debug)]
struct ResultLabels {
    result: &'static str,
}

// === impl TopologyMetrics ===

impl TopologyMetrics {
    pub fn register(reg: &mut Registry) -> Self {
        let metrics = Self::default();

        reg.register(
            "cache_lookups",
            "Total number of topology cache lookups by result",
            metrics.lookups.clone(),
        );
        reg.register(
            "cache_write_errors",
            "Total number of failed topology cache writes",
            metrics.write_errors.clone(),
        );
        reg.register(
            "builds",
            "Total number of topology builds by result",
            metrics.builds.clone(),
        );
        reg.register(
            "build_duration_seconds",
            "Time taken to apply all rules to a snapshot",
            metrics.build_duration.clone(),
        );

        metrics
    }

    pub(crate) fn cache_hit(&self) {
        self.lookup("hit").inc();
    }

    pub(crate) fn cache_miss(&self) {
        self.lookup("miss").inc();
    }

    pub(crate) fn cache_error(&self) {
        self.lookup("error").inc();
    }

    pub(crate) fn cache_write_error(&self) {
        self.write_errors.inc();
    }

    pub(crate) fn build_succeeded(&self, elapsed: Duration) {
        self.build("success").inc();
        self.build_duration.observe(elapsed.as_secs_f64());
    }

    pub(crate) fn build_failed(&self) {
        self.build("failure").inc();
    }

    fn lookup(&self, result: &'static str) -> Counter {
        self.lookups.get_or_create(&ResultLabels { result }).clone()
    }

    fn build(&self, result: &'static str) -> Counter {
        self.builds.get_or_create(&ResultLabels { result }).clone()
    }

    #[cfg(test)]
    pub(crate) fn lookups(&self, result: &'static str) -> u64 {
        self.lookup(result).get()
    }

    #[cfg(test)]
    pub(crate) fn builds(&self, result: &'static str) -> u64 {
        self.build(result).get()
    }

    #[cfg(test)]
    pub(crate) fn write_errors(&self) -> u64 {
        self.write_errors.get()
    }
}

impl Default for TopologyMetrics {
    fn default() -> Self {
        Self {
            lookups: Family::default(),
            write_errors: Counter::default(),
            builds: Family::default(),
            // 100us to ~1.6s.
            build_duration: Histogram::new(exponential_buckets(0.0001, 2.0, 15)),
        }
    }
}
