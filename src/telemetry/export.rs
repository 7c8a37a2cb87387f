//! Metrics export functionality.

use super::metrics::MetricsSnapshot;
use crate::error::{Error, Result};
use serde::Serialize;
use std::path::PathBuf;

/// Trait for exporting metrics to different formats
pub trait MetricsExporter: Send + Sync {
    fn export(&self, snapshot: &MetricsSnapshot) -> Result<()>;
}

/// Writes snapshots as pretty-printed JSON, replacing the file each time.
#[derive(Debug, Clone)]
pub struct JsonExporter {
    output_path: PathBuf,
}

impl JsonExporter {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }

    pub fn to_json(snapshot: &MetricsSnapshot) -> Result<String> {
        serde_json::to_string_pretty(&SerializableSnapshot::from(snapshot))
            .map_err(|e| Error::telemetry(format!("JSON serialization failed: {}", e)))
    }
}

impl MetricsExporter for JsonExporter {
    fn export(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        let json = Self::to_json(snapshot)?;
        std::fs::write(&self.output_path, json)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
struct SerializableSnapshot {
    uptime_secs: f64,
    submitted: u64,
    executed: u64,
    failed: u64,
    abandoned: u64,
    in_flight: u64,
    avg_latency_us: f64,
    p50_latency_us: f64,
    p95_latency_us: f64,
    p99_latency_us: f64,
    max_latency_us: f64,
    tasks_per_second: f64,
}

impl From<&MetricsSnapshot> for SerializableSnapshot {
    fn from(snapshot: &MetricsSnapshot) -> Self {
        Self {
            uptime_secs: snapshot.uptime.as_secs_f64(),
            submitted: snapshot.submitted,
            executed: snapshot.executed,
            failed: snapshot.failed,
            abandoned: snapshot.abandoned,
            in_flight: snapshot.in_flight(),
            avg_latency_us: snapshot.avg_latency_ns as f64 / 1_000.0,
            p50_latency_us: snapshot.p50_latency_ns as f64 / 1_000.0,
            p95_latency_us: snapshot.p95_latency_ns as f64 / 1_000.0,
            p99_latency_us: snapshot.p99_latency_ns as f64 / 1_000.0,
            max_latency_us: snapshot.max_latency_ns as f64 / 1_000.0,
            tasks_per_second: snapshot.tasks_per_second(),
        }
    }
}
