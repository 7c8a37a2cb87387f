//! Counters and latency distribution for a pool or a scheduler.

use hdrhistogram::Histogram;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

// one hour in nanoseconds
const MAX_TRACKED_NS: u64 = 3_600_000_000_000;

/// Runtime metrics collector.
///
/// For a [`ThreadPool`](crate::ThreadPool) the latency histogram holds task
/// execution times. For a [`TimerScheduler`](crate::TimerScheduler) it holds
/// lateness: how long after its fire time each callback actually started.
#[derive(Debug)]
pub struct Metrics {
    submitted: AtomicU64,
    executed: AtomicU64,
    failed: AtomicU64,
    abandoned: AtomicU64,
    latency_histogram: RwLock<Option<Histogram<u64>>>,
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            submitted: AtomicU64::new(0),
            executed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            abandoned: AtomicU64::new(0),
            latency_histogram: RwLock::new(Histogram::new_with_max(MAX_TRACKED_NS, 3).ok()),
            start_time: Instant::now(),
        }
    }

    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one finished unit of work.
    pub fn record_execution(&self, latency: Duration, failed: bool) {
        self.executed.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }

        let latency_ns = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
        if let Some(hist) = self.latency_histogram.write().as_mut() {
            hist.saturating_record(latency_ns);
        }
    }

    pub fn record_abandoned(&self, count: usize) {
        self.abandoned.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let histogram = self.latency_histogram.read();
        let (avg, p50, p95, p99, max) = match histogram.as_ref() {
            Some(h) if !h.is_empty() => (
                h.mean() as u64,
                h.value_at_quantile(0.50),
                h.value_at_quantile(0.95),
                h.value_at_quantile(0.99),
                h.max(),
            ),
            _ => (0, 0, 0, 0, 0),
        };

        MetricsSnapshot {
            uptime: self.start_time.elapsed(),
            submitted: self.submitted.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            avg_latency_ns: avg,
            p50_latency_ns: p50,
            p95_latency_ns: p95,
            p99_latency_ns: p99,
            max_latency_ns: max,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub uptime: Duration,
    pub submitted: u64,
    pub executed: u64,
    pub failed: u64,
    pub abandoned: u64,
    pub avg_latency_ns: u64,
    pub p50_latency_ns: u64,
    pub p95_latency_ns: u64,
    pub p99_latency_ns: u64,
    pub max_latency_ns: u64,
}

impl MetricsSnapshot {
    /// Units of work accepted but neither finished nor abandoned yet.
    pub fn in_flight(&self) -> u64 {
        self.submitted
            .saturating_sub(self.executed)
            .saturating_sub(self.abandoned)
    }

    pub fn tasks_per_second(&self) -> f64 {
        let seconds = self.uptime.as_secs_f64();
        if seconds == 0.0 {
            return 0.0;
        }
        self.executed as f64 / seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_basic() {
        let metrics = Metrics::new();

        metrics.record_submitted();
        metrics.record_submitted();
        metrics.record_submitted();
        metrics.record_execution(Duration::from_micros(1), false);
        metrics.record_execution(Duration::from_micros(2), true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.executed, 2);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.in_flight(), 1);
        assert!(snapshot.avg_latency_ns > 0);
        assert!(snapshot.max_latency_ns >= snapshot.p50_latency_ns);
    }

    #[test]
    fn test_empty_snapshot_has_zero_latency() {
        let snapshot = Metrics::new().snapshot();
        assert_eq!(snapshot.avg_latency_ns, 0);
        assert_eq!(snapshot.tasks_per_second(), 0.0);
    }
}
