//! Task execution infrastructure.
//!
//! This module provides the worker pool, its task queue, the one-shot result
//! handles returned by submission, and panic capture shared with the timer
//! scheduler.

pub mod accumulate;
pub mod panic_handler;
pub mod result;
pub mod thread_pool;
mod task;
mod worker;

pub use accumulate::accumulate;
pub use panic_handler::{PanicHandler, PanicStrategy};
pub use result::ResultHandle;
pub use thread_pool::{PoolHandle, ThreadPool};

pub(crate) use task::Task;
