use std::cmp::Ordering as CmpOrdering;
use std::time::Instant;

type BoxedCallback = Box<dyn FnOnce() + Send + 'static>;

/// A possibly-empty callback for the timer scheduler.
///
/// Any `FnOnce() + Send + 'static` closure converts into a `Callback`.
/// [`Callback::empty`] (also the `Default`) is rejected by
/// [`TimerScheduler::set_timer`](crate::TimerScheduler::set_timer).
#[derive(Default)]
pub struct Callback(Option<BoxedCallback>);

impl Callback {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Callback(Some(Box::new(f)))
    }

    pub fn empty() -> Self {
        Callback(None)
    }

    pub fn from_option<F>(f: Option<F>) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        f.map_or_else(Self::empty, Self::new)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub(crate) fn into_inner(self) -> Option<BoxedCallback> {
        self.0
    }
}

impl<F> From<F> for Callback
where
    F: FnOnce() + Send + 'static,
{
    fn from(f: F) -> Self {
        Callback::new(f)
    }
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Callback")
            .field(&if self.is_empty() { "empty" } else { "set" })
            .finish()
    }
}

/// A registered callback waiting in the scheduler's queue.
///
/// Ordered so that `BinaryHeap` pops the earliest fire time first, and among
/// equal fire times the lowest sequence id.
#[derive(Debug)]
pub(crate) struct ScheduledCallback {
    pub sequence_id: u64,
    pub callback: Callback,
    pub fire_time: Instant,
}

impl PartialEq for ScheduledCallback {
    fn eq(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time && self.sequence_id == other.sequence_id
    }
}

impl Eq for ScheduledCallback {}

impl PartialOrd for ScheduledCallback {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledCallback {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .fire_time
            .cmp(&self.fire_time)
            .then_with(|| other.sequence_id.cmp(&self.sequence_id))
    }
}
