use crate::error::TaskFailure;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanicStrategy {
    /// Contain the panic without logging.
    Isolate,
    #[default]
    LogAndContinue,
}

/// Runs `f`, converting a panic into a [`TaskFailure`] without counting or
/// logging it.
pub(crate) fn capture<F, R>(f: F) -> Result<R, TaskFailure>
where
    F: FnOnce() -> R,
{
    catch_unwind(AssertUnwindSafe(f)).map_err(TaskFailure::from_panic)
}

/// Runs units of work and turns their panics into [`TaskFailure`] values.
#[derive(Debug)]
pub struct PanicHandler {
    strategy: PanicStrategy,
    panic_count: AtomicUsize,
}

impl PanicHandler {
    pub fn new(strategy: PanicStrategy) -> Self {
        Self {
            strategy,
            panic_count: AtomicUsize::new(0),
        }
    }

    pub fn execute<F, R>(&self, f: F) -> Result<R, TaskFailure>
    where
        F: FnOnce() -> R,
    {
        capture(f).map_err(|failure| {
            self.record(&failure);
            failure
        })
    }

    /// Counts and logs a failure that was produced without unwinding.
    pub fn record(&self, failure: &TaskFailure) {
        self.panic_count.fetch_add(1, Ordering::Relaxed);

        if self.strategy == PanicStrategy::LogAndContinue {
            tracing::warn!(
                thread = std::thread::current().name().unwrap_or("unnamed"),
                "{}",
                failure
            );
        }
    }

    pub fn panic_count(&self) -> usize {
        self.panic_count.load(Ordering::Relaxed)
    }
}

impl Default for PanicHandler {
    fn default() -> Self {
        Self::new(PanicStrategy::default())
    }
}
