//! Telemetry for pools and schedulers.
//!
//! Provides metrics collection and export of point-in-time snapshots.

pub mod export;
pub mod metrics;

pub use export::{JsonExporter, MetricsExporter};
pub use metrics::{Metrics, MetricsSnapshot};
