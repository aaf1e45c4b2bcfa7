//! Prometheus metrics for reserved dispatchers.
//!
//! Gauges mirror the dispatcher's live accounting; counters mirror its
//! cumulative totals. Both are labelled by dispatcher name so several
//! dispatchers can share one registry.

use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::reserved::DispatcherStats;

/// Prometheus metrics registry with all dispatcher metrics.
pub struct Metrics {
    registry: Registry,

    // === Accounting gauges ===
    /// Configured reserved-thread capacity
    pub capacity: IntGaugeVec,

    /// Workers parked and ready
    pub available: IntGaugeVec,

    /// Workers executing a task
    pub pending: IntGaugeVec,

    /// Worker loops submitted but not yet parked
    pub starting: IntGaugeVec,

    // === Cumulative counters ===
    /// Tasks handed to a reserved worker
    pub accepted_total: IntCounterVec,

    /// Tasks declined back to the caller
    pub declined_total: IntCounterVec,

    /// Worker loops submitted to the backing executor
    pub spawned_total: IntCounterVec,

    /// Worker loops the backing executor refused
    pub spawn_failures_total: IntCounterVec,

    /// Workers retired by idle timeout
    pub idle_retired_total: IntCounterVec,

    /// Reserved tasks that panicked
    pub task_failures_total: IntCounterVec,
}

impl Metrics {
    /// Create a new metrics registry with all metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let gauge = |name: &str, help: &str| -> Result<IntGaugeVec, prometheus::Error> {
            let g = IntGaugeVec::new(Opts::new(name, help), &["dispatcher"])?;
            registry.register(Box::new(g.clone()))?;
            Ok(g)
        };
        let counter = |name: &str, help: &str| -> Result<IntCounterVec, prometheus::Error> {
            let c = IntCounterVec::new(Opts::new(name, help), &["dispatcher"])?;
            registry.register(Box::new(c.clone()))?;
            Ok(c)
        };

        let capacity = gauge("reserved_threads_capacity", "Reserved thread capacity")?;
        let available = gauge("reserved_threads_available", "Reserved threads parked and ready")?;
        let pending = gauge("reserved_threads_pending", "Reserved threads executing a task")?;
        let starting = gauge(
            "reserved_threads_starting",
            "Reserved thread loops submitted but not yet parked",
        )?;

        let accepted_total = counter(
            "reserved_threads_accepted_total",
            "Tasks handed to a reserved thread",
        )?;
        let declined_total = counter(
            "reserved_threads_declined_total",
            "Tasks declined to the fallback path",
        )?;
        let spawned_total = counter(
            "reserved_threads_spawned_total",
            "Reserved thread loops submitted to the backing executor",
        )?;
        let spawn_failures_total = counter(
            "reserved_threads_spawn_failures_total",
            "Reserved thread loops refused by the backing executor",
        )?;
        let idle_retired_total = counter(
            "reserved_threads_idle_retired_total",
            "Reserved threads retired after the idle timeout",
        )?;
        let task_failures_total = counter(
            "reserved_threads_task_failures_total",
            "Reserved tasks that panicked",
        )?;

        Ok(Self {
            registry,
            capacity,
            available,
            pending,
            starting,
            accepted_total,
            declined_total,
            spawned_total,
            spawn_failures_total,
            idle_retired_total,
            task_failures_total,
        })
    }

    /// Update all metrics from a dispatcher snapshot.
    pub fn observe(&self, stats: &DispatcherStats, dispatcher: &str) {
        let labels = &[dispatcher];

        self.capacity
            .with_label_values(labels)
            .set(stats.capacity as i64);
        self.available
            .with_label_values(labels)
            .set(stats.available as i64);
        self.pending
            .with_label_values(labels)
            .set(stats.pending as i64);
        self.starting
            .with_label_values(labels)
            .set(stats.starting as i64);

        // Snapshots are cumulative; advance each counter to the new total.
        let advance = |counter: &IntCounterVec, total: u64| {
            let c = counter.with_label_values(labels);
            c.inc_by(total.saturating_sub(c.get()));
        };
        advance(&self.accepted_total, stats.accepted);
        advance(&self.declined_total, stats.declined);
        advance(&self.spawned_total, stats.spawned);
        advance(&self.spawn_failures_total, stats.spawn_failures);
        advance(&self.idle_retired_total, stats.idle_retired);
        advance(&self.task_failures_total, stats.task_failures);
    }

    /// Export metrics in Prometheus text format.
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Get the Prometheus registry (for custom metrics).
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
