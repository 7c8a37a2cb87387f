//! One-shot result slot pairing a submitted task with its outcome.

use crate::error::{Error, Result, TaskFailure};
use parking_lot::{Condvar, Mutex};
use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

type Outcome<T> = std::result::Result<T, TaskFailure>;

enum Slot<T> {
    Pending,
    Ready(Outcome<T>),
    Taken,
    Abandoned,
}

struct Inner<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

/// Creates a connected producer/consumer pair.
pub(crate) fn channel<T>() -> (ResultSender<T>, ResultHandle<T>) {
    let inner = Arc::new(Inner {
        slot: Mutex::new(Slot::Pending),
        ready: Condvar::new(),
    });
    (
        ResultSender {
            inner: inner.clone(),
            fulfilled: false,
        },
        ResultHandle { inner },
    )
}

/// Producer side. Moved into the task closure; dropping it unfulfilled
/// marks the handle as cancelled.
pub(crate) struct ResultSender<T> {
    inner: Arc<Inner<T>>,
    fulfilled: bool,
}

impl<T> ResultSender<T> {
    pub(crate) fn fulfill(mut self, outcome: Outcome<T>) {
        *self.inner.slot.lock() = Slot::Ready(outcome);
        self.inner.ready.notify_all();
        self.fulfilled = true;
    }
}

impl<T> Drop for ResultSender<T> {
    fn drop(&mut self) {
        if self.fulfilled {
            return;
        }

        *self.inner.slot.lock() = Slot::Abandoned;
        self.inner.ready.notify_all();
    }
}

/// Handle to the eventual result of a task submitted to a
/// [`ThreadPool`](crate::executor::ThreadPool).
///
/// Dropping the handle without retrieving the result is allowed and does not
/// affect the task.
pub struct ResultHandle<T> {
    inner: Arc<Inner<T>>,
}

impl<T> ResultHandle<T> {
    /// Blocks until the task finishes.
    ///
    /// Returns [`Error::TaskFailed`] if the task panicked and
    /// [`Error::Cancelled`] if the pool shut down before the task started.
    pub fn get(self) -> Result<T> {
        let mut slot = self.inner.slot.lock();
        while matches!(*slot, Slot::Pending) {
            self.inner.ready.wait(&mut slot);
        }
        take(&mut slot)
    }

    /// Like [`get`](Self::get), but gives up after `timeout`.
    ///
    /// On timeout the handle is handed back so the caller may wait again.
    pub fn get_timeout(self, timeout: Duration) -> std::result::Result<Result<T>, Self> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Ok(self.get());
        };
        let outcome = {
            let mut slot = self.inner.slot.lock();
            while matches!(*slot, Slot::Pending) {
                if self.inner.ready.wait_until(&mut slot, deadline).timed_out() {
                    break;
                }
            }
            if matches!(*slot, Slot::Pending) {
                None
            } else {
                Some(take(&mut slot))
            }
        };

        outcome.ok_or(self)
    }

    /// Non-blocking poll. `None` while the task is still queued or running.
    pub fn try_get(&self) -> Option<Result<T>> {
        let mut slot = self.inner.slot.lock();
        if matches!(*slot, Slot::Pending) {
            return None;
        }
        Some(take(&mut slot))
    }

    /// True once an outcome is available or the task was abandoned.
    pub fn is_ready(&self) -> bool {
        !matches!(*self.inner.slot.lock(), Slot::Pending)
    }
}

fn take<T>(slot: &mut Slot<T>) -> Result<T> {
    match mem::replace(slot, Slot::Taken) {
        Slot::Ready(outcome) => outcome.map_err(Error::from),
        Slot::Abandoned => {
            *slot = Slot::Abandoned;
            Err(Error::Cancelled)
        }
        // try_get already handed the value out
        Slot::Taken | Slot::Pending => Err(Error::Cancelled),
    }
}

impl<T> std::fmt::Debug for ResultHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultHandle")
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_fulfill_then_get() {
        let (tx, rx) = channel();
        tx.fulfill(Ok(7));
        assert!(rx.is_ready());
        assert_eq!(rx.get().unwrap(), 7);
    }

    #[test]
    fn test_get_blocks_until_fulfilled() {
        let (tx, rx) = channel();
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            tx.fulfill(Ok("done"));
        });
        assert_eq!(rx.get().unwrap(), "done");
        producer.join().unwrap();
    }

    #[test]
    fn test_failure_is_reraised() {
        let (tx, rx) = channel::<i32>();
        tx.fulfill(Err(TaskFailure::Panicked {
            message: "bad".to_string(),
        }));
        let err = rx.get().unwrap_err();
        assert!(matches!(err, Error::TaskFailed(TaskFailure::Panicked { .. })));
    }

    #[test]
    fn test_dropped_sender_cancels() {
        let (tx, rx) = channel::<i32>();
        drop(tx);
        assert!(rx.is_ready());
        assert!(matches!(rx.get(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_try_get_and_timeout() {
        let (tx, rx) = channel::<u8>();
        assert!(rx.try_get().is_none());

        let rx = rx.get_timeout(Duration::from_millis(10)).unwrap_err();
        tx.fulfill(Ok(1));

        assert_eq!(rx.try_get().unwrap().unwrap(), 1);
        // value was handed out once
        assert!(matches!(rx.try_get(), Some(Err(Error::Cancelled))));
    }

    #[test]
    fn test_unrepresentable_timeout_waits_indefinitely() {
        let (tx, rx) = channel();
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            tx.fulfill(Ok(5));
        });

        let outcome = rx.get_timeout(Duration::MAX).ok().map(|r| r.unwrap());
        assert_eq!(outcome, Some(5));
        producer.join().unwrap();
    }

    #[test]
    fn test_dropped_handle_does_not_block_producer() {
        let (tx, rx) = channel::<Vec<u8>>();
        drop(rx);
        tx.fulfill(Ok(vec![1, 2, 3]));
    }
}
