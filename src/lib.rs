//! Kala - a fixed-size worker pool and a timer scheduler.
//!
//! Two independent building blocks on plain OS threads:
//!
//! - [`ThreadPool`] owns N workers fed from one FIFO queue. [`ThreadPool::submit`]
//!   returns a [`ResultHandle`] that yields the task's value or its captured panic.
//! - [`TimerScheduler`] owns one thread and runs callbacks at requested instants,
//!   ordered by fire time and then by registration order.
//!
//! # Quick Start
//!
//! ```
//! use kala_rs::prelude::*;
//! use std::sync::mpsc;
//! use std::time::Duration;
//!
//! let pool = ThreadPool::new(4).unwrap();
//! let timers = TimerScheduler::new().unwrap();
//!
//! let squared = pool.submit(|| 12 * 12);
//! assert_eq!(squared.get().unwrap(), 144);
//!
//! // A timer callback handing work to the pool.
//! let (tx, rx) = mpsc::channel();
//! let workers = pool.handle();
//! timers
//!     .set_timer_after(
//!         move || workers.execute(move || tx.send("done").unwrap()),
//!         Duration::from_millis(10),
//!     )
//!     .unwrap();
//! assert_eq!(rx.recv().unwrap(), "done");
//! ```
//!
//! # Reentrancy
//!
//! Both components release their lock before running user code, so tasks may
//! submit more tasks and callbacks may register more timers, including from
//! the very thread the component manages.
//!
//! # Shutdown
//!
//! Dropping either component stops and joins its threads. Work already running
//! finishes; queued tasks and pending timers are abandoned. Abandoned task
//! handles report [`Error::Cancelled`].
//!
//! Logging goes through [`tracing`]; install a subscriber to see it.

#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod telemetry;
pub mod timer;

pub use config::{PoolConfig, TimerConfig};
pub use error::{Error, Result, TaskFailure};
pub use executor::{accumulate, PoolHandle, ResultHandle, ThreadPool};
pub use timer::{Callback, TimerHandle, TimerScheduler};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_pool_task_sets_timer() {
        let pool = ThreadPool::new(2).unwrap();
        let timers = TimerScheduler::new().unwrap();
        let (tx, rx) = crossbeam_channel::bounded(1);

        let handle = timers.handle();
        pool.submit(move || {
            handle
                .set_timer(move || tx.send(()).unwrap(), Instant::now())
                .unwrap();
        })
        .get()
        .unwrap();

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn test_timer_callback_submits_to_pool() {
        let pool = ThreadPool::new(1).unwrap();
        let timers = TimerScheduler::new().unwrap();
        let (tx, rx) = crossbeam_channel::bounded(1);

        let workers = pool.handle();
        timers
            .set_timer(
                move || {
                    let result = workers.submit(|| 40 + 2);
                    tx.send(result).unwrap();
                },
                Instant::now(),
            )
            .unwrap();

        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(result.get().unwrap(), 42);
    }
}
