//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `dag_admissions_total{action}` - Nodes admitted
//! - `dag_rejections_total{reason}` - Candidates refused, by rejection kind
//! - `dag_nodes` - Stored nodes
//! - `dag_tips` - Current tip count
//! - `dag_admit_duration_seconds` - Validate + persist latency
//! - `dag_snapshot_failures_total` - Snapshot writes that forced a rollback

use crate::types::{Action, LedgerStats};
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Admitted nodes by action
    pub admissions_total: IntCounterVec,

    /// Rejected candidates by reason
    pub rejections_total: IntCounterVec,

    /// Stored nodes
    pub nodes: IntGauge,

    /// Current tips
    pub tips: IntGauge,

    /// Admission latency histogram
    pub admit_duration: Histogram,

    /// Failed snapshot writes
    pub snapshot_failures: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let admissions_total = IntCounterVec::new(
            Opts::new("dag_admissions_total", "Total number of nodes admitted"),
            &["action"],
        )?;
        registry.register(Box::new(admissions_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("dag_rejections_total", "Total number of rejected candidates"),
            &["reason"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let nodes = IntGauge::new("dag_nodes", "Number of stored nodes")?;
        registry.register(Box::new(nodes.clone()))?;

        let tips = IntGauge::new("dag_tips", "Number of current DAG tips")?;
        registry.register(Box::new(tips.clone()))?;

        let admit_duration = Histogram::with_opts(
            HistogramOpts::new(
                "dag_admit_duration_seconds",
                "Histogram of admission latencies",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 1.0]),
        )?;
        registry.register(Box::new(admit_duration.clone()))?;

        let snapshot_failures = IntCounter::new(
            "dag_snapshot_failures_total",
            "Snapshot writes that failed and rolled back an admission",
        )?;
        registry.register(Box::new(snapshot_failures.clone()))?;

        Ok(Self {
            admissions_total,
            rejections_total,
            nodes,
            tips,
            admit_duration,
            snapshot_failures,
            registry,
        })
    }

    /// Record an admitted node
    pub fn record_admission(&self, action: Action) {
        self.admissions_total
            .with_label_values(&[action.as_str()])
            .inc();
    }

    /// Record a rejection
    pub fn record_rejection(&self, reason: &str) {
        self.rejections_total.with_label_values(&[reason]).inc();
    }

    /// Record admission duration
    pub fn record_admit_duration(&self, duration_seconds: f64) {
        self.admit_duration.observe(duration_seconds);
    }

    /// Record a failed snapshot write
    pub fn record_snapshot_failure(&self) {
        self.snapshot_failures.inc();
    }

    /// Refresh size gauges
    pub fn update_sizes(&self, stats: &LedgerStats) {
        self.nodes.set(stats.total_nodes as i64);
        self.tips.set(stats.total_tips as i64);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("nodes", &self.nodes.get())
            .field("tips", &self.tips.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.nodes.get(), 0);
        assert_eq!(metrics.snapshot_failures.get(), 0);

        // Independent registries, so a second collector is fine
        assert!(Metrics::new().is_ok());
    }

    #[test]
    fn test_record_admission() {
        let metrics = Metrics::new().unwrap();
        metrics.record_admission(Action::Register);
        metrics.record_admission(Action::Stake);
        metrics.record_admission(Action::Stake);

        assert_eq!(
            metrics.admissions_total.with_label_values(&["register"]).get(),
            1
        );
        assert_eq!(
            metrics.admissions_total.with_label_values(&["staking"]).get(),
            2
        );
    }

    #[test]
    fn test_record_rejection() {
        let metrics = Metrics::new().unwrap();
        metrics.record_rejection("not-current-owner");
        assert_eq!(
            metrics
                .rejections_total
                .with_label_values(&["not-current-owner"])
                .get(),
            1
        );
    }

    #[test]
    fn test_update_sizes() {
        let metrics = Metrics::new().unwrap();
        metrics.update_sizes(&LedgerStats {
            total_nodes: 7,
            total_tips: 2,
            ..Default::default()
        });
        assert_eq!(metrics.nodes.get(), 7);
        assert_eq!(metrics.tips.get(), 2);
        assert!(!metrics.registry().gather().is_empty());
    }
}
