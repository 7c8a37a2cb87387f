//! Single-threaded timer scheduling.

mod entry;
mod scheduler;

pub use entry::Callback;
pub use scheduler::{FailureHandler, TimerHandle, TimerScheduler};
