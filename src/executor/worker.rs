// worker thread stuff
use super::thread_pool::PoolShared;
use super::Task;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub type WorkerId = usize;

// stats for each worker
#[derive(Debug, Default)]
pub struct WorkerState {
    pub tasks_executed: AtomicU64,
    pub tasks_failed: AtomicU64,
}

pub(crate) struct Worker {
    pub id: WorkerId,
    pub state: Arc<WorkerState>,
    shared: Arc<PoolShared>,
}

impl Worker {
    pub fn new(id: WorkerId, shared: Arc<PoolShared>) -> Self {
        Self {
            id,
            state: Arc::new(WorkerState::default()),
            shared,
        }
    }

    // main loop
    pub fn run(&self) {
        tracing::debug!(worker = self.id, "worker started");

        while let Some(task) = self.next_task() {
            self.execute_task(task);
        }

        tracing::debug!(
            worker = self.id,
            executed = self.state.tasks_executed.load(Ordering::Relaxed),
            "worker stopped"
        );
    }

    /// Blocks until a task is available or the pool is stopping.
    ///
    /// Stop wins over queued work: whatever is still queued is left for the
    /// pool to abandon.
    fn next_task(&self) -> Option<Task> {
        let mut queue = self.shared.queue.lock();
        loop {
            if queue.shutdown {
                return None;
            }
            if let Some(task) = queue.tasks.pop_front() {
                return Some(task);
            }
            self.shared.available.wait(&mut queue);
        }
    }

    fn execute_task(&self, task: Task) {
        let tid = task.id;
        let start = Instant::now();
        tracing::trace!(worker = self.id, task = tid.as_u64(), "executing task");

        // Tasks capture their own panics; the outer guard keeps the worker
        // alive if anything escapes anyway (e.g. a panicking drop).
        let failed = match self.shared.panic_handler.execute(|| task.execute()) {
            Ok(Ok(())) => false,
            Ok(Err(failure)) => {
                self.shared.panic_handler.record(&failure);
                true
            }
            Err(_) => true,
        };

        if failed {
            self.state.tasks_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.state.tasks_executed.fetch_add(1, Ordering::Relaxed);
        self.shared.metrics.record_execution(start.elapsed(), failed);
    }
}
