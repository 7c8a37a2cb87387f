use super::panic_handler::{capture, PanicHandler};
use super::result::{self, ResultHandle};
use super::Task;
use super::worker::{Worker, WorkerId, WorkerState};
use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::telemetry::{Metrics, MetricsSnapshot};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

#[cfg(target_os = "linux")]
fn pin_thread_to_core(core_id: usize) {
    let cores = num_cpus::get();
    if cores == 0 {
        return;
    }

    unsafe {
        let mut cpuset: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_SET(core_id % cores, &mut cpuset);
        let result = libc::sched_setaffinity(
            0, // current thread
            std::mem::size_of::<libc::cpu_set_t>(),
            &cpuset,
        );
        if result != 0 {
            tracing::warn!(
                thread = std::thread::current().name().unwrap_or("unknown"),
                core = core_id % cores,
                "failed to pin worker thread"
            );
        }
    }
}

pub(crate) struct QueueState {
    pub(crate) tasks: VecDeque<Task>,
    pub(crate) shutdown: bool,
}

/// State shared between the pool owner, its handles and its workers.
pub(crate) struct PoolShared {
    pub(crate) queue: Mutex<QueueState>,
    pub(crate) available: Condvar,
    pub(crate) panic_handler: PanicHandler,
    pub(crate) metrics: Metrics,
}

impl PoolShared {
    fn submit<F, R>(&self, f: F) -> ResultHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (sender, handle) = result::channel();
        let task = Task::new(move || {
            let outcome = capture(f);
            let report = outcome.as_ref().map(|_| ()).map_err(|failure| failure.clone());
            sender.fulfill(outcome);
            report
        });

        self.enqueue(task);
        handle
    }

    fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(Task::new(move || capture(f)));
    }

    fn enqueue(&self, task: Task) {
        self.metrics.record_submitted();

        let rejected = {
            let mut queue = self.queue.lock();
            if queue.shutdown {
                Some(task)
            } else {
                queue.tasks.push_back(task);
                None
            }
        };

        match rejected {
            // Dropped outside the lock; its result handle reports Cancelled.
            Some(task) => {
                tracing::trace!(task = task.id.as_u64(), "pool stopped, task abandoned");
                self.metrics.record_abandoned(1);
                drop(task);
            }
            None => {
                self.available.notify_one();
            }
        }
    }
}

struct WorkerHandle {
    id: WorkerId,
    thread: Option<JoinHandle<()>>,
    state: Arc<WorkerState>,
}

/// A fixed-size pool of worker threads fed from one FIFO queue.
///
/// ```
/// use kala_rs::ThreadPool;
///
/// let pool = ThreadPool::new(2).unwrap();
/// let handle = pool.submit(|| 6 * 7);
/// assert_eq!(handle.get().unwrap(), 42);
/// ```
///
/// Dropping the pool stops the workers and joins them. Tasks already running
/// finish; tasks still queued are abandoned and their handles report
/// [`Error::Cancelled`].
pub struct ThreadPool {
    workers: Vec<WorkerHandle>,
    shared: Arc<PoolShared>,
    num_threads: usize,
}

impl ThreadPool {
    /// Spawns `num_threads` workers with default settings otherwise.
    pub fn new(num_threads: usize) -> Result<Self> {
        Self::with_config(&PoolConfig::with_threads(num_threads))
    }

    pub fn with_config(config: &PoolConfig) -> Result<Self> {
        config.validate()?;

        let num_threads = config.worker_threads();
        if num_threads == 0 {
            return Err(Error::config("need at least 1 thread"));
        }

        let shared = Arc::new(PoolShared {
            queue: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                shutdown: false,
            }),
            available: Condvar::new(),
            panic_handler: PanicHandler::new(config.panic_strategy),
            metrics: Metrics::new(),
        });

        let mut pool = Self {
            workers: Vec::with_capacity(num_threads),
            shared,
            num_threads,
        };

        for id in 0..num_threads {
            let worker = Worker::new(id, pool.shared.clone());
            let state = worker.state.clone();
            let name = format!("{}-{}", config.thread_name_prefix, id);

            let mut builder = thread::Builder::new().name(name);
            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }

            let pin_workers = config.pin_workers;
            // On failure the partially built pool is dropped, which joins
            // the workers spawned so far.
            let thread = builder
                .spawn(move || {
                    #[cfg(target_os = "linux")]
                    if pin_workers {
                        pin_thread_to_core(id);
                    }
                    #[cfg(not(target_os = "linux"))]
                    let _ = pin_workers;

                    worker.run();
                })
                .map_err(|e| Error::executor(format!("spawn failed: {}", e)))?;

            pool.workers.push(WorkerHandle {
                id,
                thread: Some(thread),
                state,
            });
        }

        tracing::debug!(threads = num_threads, "thread pool started");
        Ok(pool)
    }

    /// Queues `f` and returns a handle to its eventual result.
    ///
    /// Never blocks on execution. May be called from inside a running task.
    pub fn submit<F, R>(&self, f: F) -> ResultHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.shared.submit(f)
    }

    /// Queues `f` without a result handle. Panics are contained and counted.
    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.execute(f);
    }

    /// A cloneable submission handle that does not keep the workers alive.
    pub fn handle(&self) -> PoolHandle {
        PoolHandle {
            shared: self.shared.clone(),
        }
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Tasks queued but not yet picked up by a worker.
    pub fn pending_tasks(&self) -> usize {
        self.shared.queue.lock().tasks.len()
    }

    /// Number of task panics contained so far.
    pub fn panic_count(&self) -> usize {
        self.shared.panic_handler.panic_count()
    }

    /// Tasks executed by each worker, indexed by worker id.
    pub fn tasks_per_worker(&self) -> Vec<u64> {
        self.workers
            .iter()
            .map(|w| w.state.tasks_executed.load(Ordering::Relaxed))
            .collect()
    }

    /// Failed tasks per worker, a subset of [`tasks_per_worker`](Self::tasks_per_worker).
    pub fn failures_per_worker(&self) -> Vec<u64> {
        self.workers
            .iter()
            .map(|w| w.state.tasks_failed.load(Ordering::Relaxed))
            .collect()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Stops the workers and joins them. Idempotent.
    pub fn shutdown(&mut self) {
        {
            let mut queue = self.shared.queue.lock();
            if queue.shutdown && self.workers.iter().all(|w| w.thread.is_none()) {
                return;
            }
            queue.shutdown = true;
        }

        // wake everyone up to check shutdown flag
        self.shared.available.notify_all();

        let current = thread::current().id();
        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.thread().id() == current {
                    // Dropped from one of our own tasks; the worker exits on
                    // its own once the task returns.
                    tracing::debug!(worker = worker.id, "pool dropped from its own worker, detaching");
                    continue;
                }
                if thread.join().is_err() {
                    tracing::error!(worker = worker.id, "worker thread panicked");
                }
            }
        }

        let abandoned: Vec<Task> = self.shared.queue.lock().tasks.drain(..).collect();
        if !abandoned.is_empty() {
            tracing::debug!(count = abandoned.len(), "abandoning queued tasks");
            self.shared.metrics.record_abandoned(abandoned.len());
        }
        drop(abandoned);

        tracing::debug!("thread pool stopped");
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("num_threads", &self.num_threads)
            .field("pending_tasks", &self.pending_tasks())
            .finish()
    }
}

/// Cloneable submission side of a [`ThreadPool`].
///
/// Once the pool is dropped, submissions are abandoned immediately and their
/// handles report [`Error::Cancelled`].
#[derive(Clone)]
pub struct PoolHandle {
    shared: Arc<PoolShared>,
}

impl PoolHandle {
    pub fn submit<F, R>(&self, f: F) -> ResultHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.shared.submit(f)
    }

    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.execute(f);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.queue.lock().shutdown
    }
}

impl std::fmt::Debug for PoolHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolHandle")
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}
