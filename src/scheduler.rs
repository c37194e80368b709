//! Recurring tasks keyed by identity.
//!
//! Each scheduled key owns one spawned loop driven by a tokio interval and a
//! `watch` channel carrying its period. Sending `None` cancels the loop. The
//! loop polls that channel first (biased select) and checks it again right
//! before starting a tick, so once [`Scheduler::cancel`] returns no new tick
//! begins; a tick already running is left to finish.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::watch;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::debug;

const MIN_PERIOD: Duration = Duration::from_millis(1);
const MAX_PERIOD: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Work run on every tick.
pub type Task = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

pub struct Scheduler<K> {
    tasks: Mutex<HashMap<K, watch::Sender<Option<Duration>>>>,
}

impl<K> Scheduler<K>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Run `task` every `period`, the first time one period from now, until
    /// cancelled.
    ///
    /// Returns false, leaving the existing schedule alone, if `key` is
    /// already scheduled. Must be called from within a tokio runtime.
    pub fn schedule(&self, key: K, period: Duration, task: Task) -> bool {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if tasks.contains_key(&key) {
            return false;
        }

        let (control, updates) = watch::channel(Some(period));
        tokio::spawn(run(key.clone(), period, updates, task));
        tasks.insert(key, control);
        true
    }

    /// Change the period of a scheduled key. The next tick is one new period
    /// from now.
    pub fn reschedule(&self, key: &K, period: Duration) -> bool {
        let tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        match tasks.get(key) {
            Some(control) => {
                control.send_replace(Some(period));
                true
            }
            None => false,
        }
    }

    /// Stop scheduling `key`. False if it was not scheduled.
    pub fn cancel(&self, key: &K) -> bool {
        let removed = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        match removed {
            Some(control) => {
                control.send_replace(None);
                true
            }
            None => false,
        }
    }

    /// Cancel every schedule; returns how many there were.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        for (_, control) in &drained {
            control.send_replace(None);
        }
        drained.len()
    }

    pub fn is_scheduled(&self, key: &K) -> bool {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K> Default for Scheduler<K>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> std::fmt::Debug for Scheduler<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scheduled = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("Scheduler")
            .field("scheduled", &scheduled)
            .finish()
    }
}

/// Interval whose first tick is one period from now. Periods are clamped to
/// `MIN_PERIOD..=MAX_PERIOD`.
fn ticker(period: Duration) -> Interval {
    let period = period.clamp(MIN_PERIOD, MAX_PERIOD);
    let now = Instant::now();
    let start = now.checked_add(period).unwrap_or(now);
    let mut interval = time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn run<K: std::fmt::Debug>(
    key: K,
    period: Duration,
    mut updates: watch::Receiver<Option<Duration>>,
    task: Task,
) {
    let mut interval = ticker(period);
    loop {
        tokio::select! {
            biased;
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let Some(period) = *updates.borrow_and_update() else {
                    break;
                };
                debug!(key = ?key, period = ?period, "schedule_updated");
                interval = ticker(period);
            }
            _ = interval.tick() => {
                if updates.borrow().is_none() {
                    break;
                }
                task().await;
            }
        }
    }
    debug!(key = ?key, "schedule_stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: &Arc<AtomicUsize>) -> Task {
        let counter = Arc::clone(counter);
        Arc::new(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn runs_every_period() {
        let scheduler = Scheduler::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        assert!(scheduler.schedule("argus", Duration::from_secs(10), counting(&ticks)));
        assert!(!scheduler.schedule("argus", Duration::from_secs(1), counting(&ticks)));

        time::sleep(Duration::from_millis(1)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_secs(25)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert!(scheduler.is_scheduled(&"argus"));
        assert_eq!(scheduler.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_further_ticks() {
        let scheduler = Scheduler::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        scheduler.schedule(1u32, Duration::from_secs(5), counting(&ticks));
        time::sleep(Duration::from_secs(6)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        assert!(scheduler.cancel(&1));
        assert!(!scheduler.cancel(&1));
        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reschedule_changes_the_period() {
        let scheduler = Scheduler::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        scheduler.schedule("io", Duration::from_secs(100), counting(&ticks));
        time::sleep(Duration::from_millis(1)).await;
        assert!(scheduler.reschedule(&"io", Duration::from_secs(2)));
        time::sleep(Duration::from_millis(4500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert!(!scheduler.reschedule(&"hera", Duration::from_secs(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn huge_periods_are_clamped() {
        assert_eq!(ticker(Duration::MAX).period(), MAX_PERIOD);
        assert_eq!(ticker(Duration::ZERO).period(), MIN_PERIOD);

        let scheduler = Scheduler::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        assert!(scheduler.schedule("argus", Duration::MAX, counting(&ticks)));
        time::sleep(Duration::from_secs(60)).await;
        assert!(scheduler.reschedule(&"argus", Duration::from_secs(u64::MAX)));
        time::sleep(Duration::from_secs(60)).await;

        assert_eq!(ticks.load(Ordering::SeqCst), 0);
        assert!(scheduler.is_scheduled(&"argus"));
        assert!(scheduler.cancel(&"argus"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_clears_every_key() {
        let scheduler = Scheduler::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        scheduler.schedule("a", Duration::from_secs(1), counting(&ticks));
        scheduler.schedule("b", Duration::from_secs(1), counting(&ticks));
        assert_eq!(scheduler.cancel_all(), 2);
        assert!(scheduler.is_empty());

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }
}
