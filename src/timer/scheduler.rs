use super::entry::{Callback, ScheduledCallback};
use crate::config::TimerConfig;
use crate::error::{Error, Result, TaskFailure};
use crate::executor::panic_handler::capture;
use crate::executor::PanicHandler;
use crate::telemetry::{Metrics, MetricsSnapshot};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// Stand-in for delays too large to represent as an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

fn fire_time_after(delay: Duration) -> Result<Instant> {
    let now = Instant::now();
    now.checked_add(delay)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .ok_or_else(|| Error::config(format!("timer delay out of range: {:?}", delay)))
}

/// Receives every failure raised by a callback.
pub type FailureHandler = Box<dyn Fn(TaskFailure) + Send + Sync + 'static>;

struct TimerState {
    queue: BinaryHeap<ScheduledCallback>,
    next_sequence: u64,
    shutdown: bool,
}

pub(crate) struct TimerShared {
    state: Mutex<TimerState>,
    wakeup: Condvar,
    failure_handler: Option<FailureHandler>,
    panic_handler: PanicHandler,
    metrics: Metrics,
}

impl TimerShared {
    fn set_timer(&self, callback: Callback, fire_time: Instant) -> Result<()> {
        if callback.is_empty() {
            return Err(Error::InvalidCallback);
        }
        self.metrics.record_submitted();

        let inserted = {
            let mut state = self.state.lock();
            if state.shutdown {
                Err(callback)
            } else {
                let sequence_id = state.next_sequence;
                state.next_sequence += 1;

                let earliest = state
                    .queue
                    .peek()
                    .map_or(true, |next| fire_time < next.fire_time);
                state.queue.push(ScheduledCallback {
                    sequence_id,
                    callback,
                    fire_time,
                });
                Ok(earliest)
            }
        };

        match inserted {
            Ok(true) => {
                self.wakeup.notify_one();
            }
            Ok(false) => {}
            // Registration raced with shutdown; the callback is abandoned
            // like any other pending timer.
            Err(callback) => {
                tracing::trace!("scheduler stopped, timer abandoned");
                self.metrics.record_abandoned(1);
                drop(callback);
            }
        }

        Ok(())
    }

    fn run(&self) {
        tracing::debug!("timer thread started");

        let mut state = self.state.lock();
        loop {
            if state.shutdown {
                break;
            }

            match state.queue.peek().map(|next| next.fire_time) {
                None => {
                    self.wakeup.wait(&mut state);
                }
                Some(fire_time) if Instant::now() < fire_time => {
                    self.wakeup.wait_until(&mut state, fire_time);
                }
                Some(_) => {
                    if let Some(entry) = state.queue.pop() {
                        // Unlocked so the callback may register timers itself.
                        MutexGuard::unlocked(&mut state, || self.invoke(entry));
                    }
                }
            }
        }

        tracing::debug!(pending = state.queue.len(), "timer thread stopped");
    }

    fn invoke(&self, entry: ScheduledCallback) {
        let lateness = Instant::now().saturating_duration_since(entry.fire_time);
        tracing::trace!(
            sequence = entry.sequence_id,
            lateness_us = lateness.as_micros() as u64,
            "firing timer"
        );

        let outcome = match entry.callback.into_inner() {
            Some(callback) => self.panic_handler.execute(callback),
            None => {
                let failure = TaskFailure::EmptyCallback;
                self.panic_handler.record(&failure);
                Err(failure)
            }
        };

        self.metrics.record_execution(lateness, outcome.is_err());

        if let Err(failure) = outcome {
            self.report(failure);
        }
    }

    fn report(&self, failure: TaskFailure) {
        let Some(handler) = self.failure_handler.as_ref() else {
            return;
        };

        if let Err(nested) = capture(|| handler(failure)) {
            tracing::error!("failure handler panicked: {}", nested);
        }
    }
}

/// Runs callbacks at requested instants on one dedicated thread.
///
/// Callbacks fire in `(fire_time, registration order)` order. A callback that
/// panics is contained and handed to the failure handler, if one was given.
///
/// ```
/// use kala_rs::TimerScheduler;
/// use std::time::Duration;
///
/// let timers = TimerScheduler::new().unwrap();
/// let (tx, rx) = std::sync::mpsc::channel();
/// timers
///     .set_timer_after(move || tx.send("fired").unwrap(), Duration::from_millis(5))
///     .unwrap();
/// assert_eq!(rx.recv().unwrap(), "fired");
/// ```
///
/// Dropping the scheduler stops and joins its thread; timers still pending
/// never fire.
pub struct TimerScheduler {
    shared: Arc<TimerShared>,
    thread: Option<JoinHandle<()>>,
}

impl TimerScheduler {
    pub fn new() -> Result<Self> {
        Self::with_config(&TimerConfig::default(), None)
    }

    pub fn with_failure_handler<H>(handler: H) -> Result<Self>
    where
        H: Fn(TaskFailure) + Send + Sync + 'static,
    {
        Self::with_config(&TimerConfig::default(), Some(Box::new(handler)))
    }

    pub fn with_config(config: &TimerConfig, failure_handler: Option<FailureHandler>) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(TimerShared {
            state: Mutex::new(TimerState {
                queue: BinaryHeap::new(),
                next_sequence: 0,
                shutdown: false,
            }),
            wakeup: Condvar::new(),
            failure_handler,
            panic_handler: PanicHandler::new(config.panic_strategy),
            metrics: Metrics::new(),
        });

        let mut builder = thread::Builder::new().name(config.thread_name.clone());
        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let thread_shared = shared.clone();
        let thread = builder
            .spawn(move || thread_shared.run())
            .map_err(|e| Error::executor(format!("spawn failed: {}", e)))?;

        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    /// Registers `callback` to run at or after `fire_time`.
    ///
    /// A fire time in the past runs as soon as possible. Safe to call from
    /// inside a running callback. Fails with [`Error::InvalidCallback`] for
    /// an empty callback, leaving other timers untouched.
    pub fn set_timer(&self, callback: impl Into<Callback>, fire_time: Instant) -> Result<()> {
        self.shared.set_timer(callback.into(), fire_time)
    }

    pub fn set_timer_after(&self, callback: impl Into<Callback>, delay: Duration) -> Result<()> {
        self.shared.set_timer(callback.into(), fire_time_after(delay)?)
    }

    /// A cloneable registration handle, usable from inside callbacks.
    pub fn handle(&self) -> TimerHandle {
        TimerHandle {
            shared: self.shared.clone(),
        }
    }

    /// Timers registered but not yet fired.
    pub fn pending_timers(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// Callback panics and empty callbacks seen so far.
    pub fn failure_count(&self) -> usize {
        self.shared.panic_handler.panic_count()
    }

    /// Latency figures in the snapshot are lateness past each fire time.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Stops the thread and abandons pending timers. Idempotent.
    pub fn shutdown(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.wakeup.notify_all();

        if let Some(thread) = self.thread.take() {
            if thread.thread().id() == thread::current().id() {
                // Dropped from one of our own callbacks; the loop sees the
                // flag once the callback returns.
                tracing::debug!("scheduler dropped from its own thread, detaching");
            } else if thread.join().is_err() {
                tracing::error!("timer thread panicked");
            }
        }

        let abandoned: Vec<ScheduledCallback> = self.shared.state.lock().queue.drain().collect();
        if !abandoned.is_empty() {
            tracing::debug!(count = abandoned.len(), "abandoning pending timers");
            self.shared.metrics.record_abandoned(abandoned.len());
        }
        drop(abandoned);
    }
}

impl Drop for TimerScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for TimerScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerScheduler")
            .field("pending_timers", &self.pending_timers())
            .field("running", &self.thread.is_some())
            .finish()
    }
}

/// Cloneable registration side of a [`TimerScheduler`].
///
/// After the scheduler is dropped, registrations are accepted and discarded.
#[derive(Clone)]
pub struct TimerHandle {
    shared: Arc<TimerShared>,
}

impl TimerHandle {
    pub fn set_timer(&self, callback: impl Into<Callback>, fire_time: Instant) -> Result<()> {
        self.shared.set_timer(callback.into(), fire_time)
    }

    pub fn set_timer_after(&self, callback: impl Into<Callback>, delay: Duration) -> Result<()> {
        self.shared.set_timer(callback.into(), fire_time_after(delay)?)
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.state.lock().shutdown
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}
