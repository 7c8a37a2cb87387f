//! Task representation and execution.

use crate::error::TaskFailure;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

type Job = Box<dyn FnOnce() -> Result<(), TaskFailure> + Send + 'static>;

static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// An owned unit of work, executed exactly once by whichever worker dequeues it.
///
/// The job reports its own captured failure so the worker can account for it
/// after the result has already been handed to the consumer.
pub(crate) struct Task {
    pub(crate) id: TaskId,
    pub(crate) func: Job,
    pub(crate) submit_time: Instant,
}

impl Task {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<(), TaskFailure> + Send + 'static,
    {
        Task {
            id: TaskId::next(),
            func: Box::new(f),
            submit_time: Instant::now(),
        }
    }

    pub fn execute(self) -> Result<(), TaskFailure> {
        (self.func)()
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("submit_time", &self.submit_time)
            .finish()
    }
}
