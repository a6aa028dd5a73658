//! Metric accumulators and the final report.

use skymesh::time::{Duration, Timestamp};

/// Simulation-global accumulators, updated by the event loop as nodes
/// report originations and deliveries.
#[derive(Debug, Clone, Default)]
pub struct SimMetrics {
    /// DataMsgs emitted at sources (post-handshake). SessionReqs that
    /// never produce an ack do not count.
    pub attempted: u64,
    /// DataMsg arrivals at destinations. Duplicate arrivals over
    /// distinct paths each count.
    pub delivered: u64,
    /// Frames lost to MAC backoff-cap exhaustion.
    pub mac_dropped: u64,
    /// Sum of end-to-end latencies over deliveries.
    pub latency_sum: Duration,
    /// Sum of path lengths (node counts) over deliveries.
    pub hops_sum: u64,
}

impl SimMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one delivery.
    pub fn record_delivery(&mut self, latency: Duration, hops: usize) {
        self.delivered += 1;
        self.latency_sum += latency;
        self.hops_sum += hops as u64;
    }

    /// Fold the accumulators into the final report.
    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            pdr: self.delivered as f64 / self.attempted.max(1) as f64,
            avg_latency_s: self.latency_sum.as_secs_f64() / self.delivered.max(1) as f64,
            avg_hops: self.hops_sum as f64 / self.delivered.max(1) as f64,
            delivered: self.delivered,
            attempted: self.attempted,
        }
    }
}

/// Final performance report.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsReport {
    /// Packet delivery ratio, `delivered / max(1, attempted)`.
    pub pdr: f64,
    /// Mean end-to-end latency over delivered DataMsgs, seconds.
    pub avg_latency_s: f64,
    /// Mean path length (node count) over delivered DataMsgs.
    pub avg_hops: f64,
    pub delivered: u64,
    pub attempted: u64,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// Virtual time the run ended at.
    pub end_time: Timestamp,
    /// Final accumulator state.
    pub metrics: SimMetrics,
}

impl SimulationResult {
    pub fn report(&self) -> MetricsReport {
        self.metrics.report()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_metrics_report() {
        let report = SimMetrics::new().report();
        assert_eq!(report.pdr, 0.0);
        assert_eq!(report.avg_latency_s, 0.0);
        assert_eq!(report.avg_hops, 0.0);
    }

    #[test]
    fn test_report_averages() {
        let mut metrics = SimMetrics::new();
        metrics.attempted = 4;
        metrics.record_delivery(Duration::from_millis(100), 2);
        metrics.record_delivery(Duration::from_millis(300), 4);

        let report = metrics.report();
        assert_eq!(report.delivered, 2);
        assert_eq!(report.attempted, 4);
        assert!((report.pdr - 0.5).abs() < 1e-12);
        assert!((report.avg_latency_s - 0.2).abs() < 1e-12);
        assert!((report.avg_hops - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_deliveries_without_attempts_do_not_panic() {
        // Duplicates can outnumber attempts; the report must stay total.
        let mut metrics = SimMetrics::new();
        metrics.attempted = 1;
        metrics.record_delivery(Duration::from_millis(10), 2);
        metrics.record_delivery(Duration::from_millis(10), 3);
        assert!((metrics.report().pdr - 2.0).abs() < 1e-12);
    }
}
