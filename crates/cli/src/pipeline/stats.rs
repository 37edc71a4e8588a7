//! Replay statistics and metrics.

use std::time::Duration;

use observability::SyncSetMetricsAggregator;
use serde::Serialize;

/// Statistics from a replay run
#[derive(Debug, Clone, Default)]
pub struct ReplayStats {
    /// Scenario events applied to the input queues
    pub events_applied: u64,

    /// Data-ready notifications raised
    pub notifications: u64,

    /// Errors reported through the run's error callback
    pub errors_reported: u64,

    /// Total duration of the replay
    pub duration: Duration,

    /// Number of input streams
    pub input_streams: usize,

    /// Sync sets at run start
    pub sync_sets: usize,

    /// Per sync set invocation statistics
    pub sync_metrics: SyncSetMetricsAggregator,
}

/// Serializable view of [`ReplayStats`]
#[derive(Debug, Serialize)]
pub struct StatsReport {
    pub events_applied: u64,
    pub notifications: u64,
    pub errors_reported: u64,
    pub duration_ms: f64,
    pub input_streams: usize,
    pub sync_sets: usize,
    pub invocations: u64,
    pub packets_delivered: u64,
    pub empty_slots: u64,
    pub closed: bool,
    pub invocations_per_set: Vec<SetReport>,
}

#[derive(Debug, Serialize)]
pub struct SetReport {
    pub sync_set: usize,
    pub invocations: u64,
    pub mean_gap: f64,
}

impl ReplayStats {
    /// Invocations per second of wall time
    pub fn invocation_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.sync_metrics.total_invocations as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Build the serializable report
    pub fn report(&self) -> StatsReport {
        let summary = self.sync_metrics.summary();
        StatsReport {
            events_applied: self.events_applied,
            notifications: self.notifications,
            errors_reported: self.errors_reported,
            duration_ms: self.duration.as_secs_f64() * 1000.0,
            input_streams: self.input_streams,
            sync_sets: self.sync_sets,
            invocations: summary.total_invocations,
            packets_delivered: summary.packets_delivered,
            empty_slots: summary.empty_slots,
            closed: summary.closed,
            invocations_per_set: summary
                .per_set
                .iter()
                .map(|(index, (invocations, gaps))| SetReport {
                    sync_set: *index,
                    invocations: *invocations,
                    mean_gap: gaps.mean,
                })
                .collect(),
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Replay Statistics ===\n");

        println!("Overview");
        println!("   ├─ Duration: {:.3}s", self.duration.as_secs_f64());
        println!("   ├─ Events applied: {}", self.events_applied);
        println!("   ├─ Notifications: {}", self.notifications);
        println!("   ├─ Invocation rate: {:.2}/s", self.invocation_rate());
        println!("   ├─ Input streams: {}", self.input_streams);
        println!("   ├─ Sync sets: {}", self.sync_sets);
        println!("   └─ Errors reported: {}", self.errors_reported);

        println!("\n{}", self.sync_metrics.summary());
    }
}
