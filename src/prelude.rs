pub use crate::config::{PoolConfig, PoolConfigBuilder, TimerConfig, TimerConfigBuilder};
pub use crate::error::{Error, Result, TaskFailure};
pub use crate::executor::{accumulate, PanicStrategy, PoolHandle, ResultHandle, ThreadPool};
pub use crate::telemetry::{Metrics, MetricsSnapshot};
pub use crate::timer::{Callback, TimerHandle, TimerScheduler};
