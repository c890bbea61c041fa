//! Prometheus metrics for the check service.

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::time::Duration;

/// Labels for probe outcome metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OutcomeLabels {
    /// Outcome (success, timeout, error)
    pub outcome: String,
}

/// Terminal result class of a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success,
    Timeout,
    Error,
}

impl ProbeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeOutcome::Success => "success",
            ProbeOutcome::Timeout => "timeout",
            ProbeOutcome::Error => "error",
        }
    }
}

/// Metrics registry with all check service metrics
pub struct MetricsRegistry {
    /// Prometheus registry
    pub registry: Registry,

    /// Probes by outcome
    probes_total: Family<OutcomeLabels, Counter>,
    /// Time from dispatch to outcome
    probe_duration_seconds: Histogram,
    /// Checks in the table
    checks_active: Gauge,
    /// Scheduler ticks started
    ticks_total: Counter,
    /// Failed snapshots
    snapshot_failures_total: Counter,
    /// Outcomes dropped because the check was deleted mid-flight
    outcomes_discarded_total: Counter,
    /// Failed journal appends
    journal_failures_total: Counter,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    /// Create a new metrics registry
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let probes_total = Family::<OutcomeLabels, Counter>::default();
        registry.register(
            "checks_probes",
            "Total probes by outcome",
            probes_total.clone(),
        );

        // Exponential buckets from 1ms to ~16s
        let probe_duration_seconds = Histogram::new(exponential_buckets(0.001, 2.0, 15));
        registry.register(
            "checks_probe_duration_seconds",
            "Time from probe dispatch to outcome in seconds",
            probe_duration_seconds.clone(),
        );

        let checks_active = Gauge::default();
        registry.register(
            "checks_active",
            "Number of checks in the table",
            checks_active.clone(),
        );

        let ticks_total = Counter::default();
        registry.register("checks_ticks", "Total scheduler ticks", ticks_total.clone());

        let snapshot_failures_total = Counter::default();
        registry.register(
            "checks_snapshot_failures",
            "Total failed snapshots",
            snapshot_failures_total.clone(),
        );

        let outcomes_discarded_total = Counter::default();
        registry.register(
            "checks_outcomes_discarded",
            "Probe outcomes discarded because the check no longer exists",
            outcomes_discarded_total.clone(),
        );

        let journal_failures_total = Counter::default();
        registry.register(
            "checks_journal_failures",
            "Total failed journal appends",
            journal_failures_total.clone(),
        );

        Self {
            registry,
            probes_total,
            probe_duration_seconds,
            checks_active,
            ticks_total,
            snapshot_failures_total,
            outcomes_discarded_total,
            journal_failures_total,
        }
    }

    /// Record a committed probe outcome
    pub fn record_probe(&self, outcome: ProbeOutcome, duration: Duration) {
        self.probes_total
            .get_or_create(&OutcomeLabels {
                outcome: outcome.as_str().to_string(),
            })
            .inc();
        self.probe_duration_seconds.observe(duration.as_secs_f64());
    }

    /// Record the start of a scheduler tick
    pub fn record_tick(&self, checks: usize) {
        self.ticks_total.inc();
        self.checks_active.set(checks as i64);
    }

    pub fn record_snapshot_failure(&self) {
        self.snapshot_failures_total.inc();
    }

    pub fn record_discarded_outcome(&self) {
        self.outcomes_discarded_total.inc();
    }

    pub fn record_journal_failure(&self) {
        self.journal_failures_total.inc();
    }

    /// Encode all metrics in the Prometheus text format
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        prometheus_client::encoding::text::encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_probe() {
        let registry = MetricsRegistry::new();
        registry.record_probe(ProbeOutcome::Success, Duration::from_millis(50));
        registry.record_probe(ProbeOutcome::Success, Duration::from_millis(70));
        registry.record_probe(ProbeOutcome::Timeout, Duration::from_secs(5));

        let text = registry.encode().unwrap();
        assert!(text.contains(r#"checks_probes_total{outcome="success"} 2"#));
        assert!(text.contains(r#"checks_probes_total{outcome="timeout"} 1"#));
        assert!(text.contains("checks_probe_duration_seconds_count 3"));
    }

    #[test]
    fn test_record_tick() {
        let registry = MetricsRegistry::new();
        registry.record_tick(7);
        registry.record_tick(4);

        let text = registry.encode().unwrap();
        assert!(text.contains("checks_ticks_total 2"));
        assert!(text.contains("checks_active 4"));
    }

    #[test]
    fn test_failure_counters() {
        let registry = MetricsRegistry::new();
        registry.record_snapshot_failure();
        registry.record_discarded_outcome();
        registry.record_journal_failure();
        registry.record_journal_failure();

        let text = registry.encode().unwrap();
        assert!(text.contains("checks_snapshot_failures_total 1"));
        assert!(text.contains("checks_outcomes_discarded_total 1"));
        assert!(text.contains("checks_journal_failures_total 2"));
    }
}
