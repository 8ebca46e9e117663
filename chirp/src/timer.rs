//! Timer registry: delayed and periodic callbacks with race-free cancellation.
//!
//! Both the typing tracker and the notification queue drive their expiry
//! logic through this registry. The contract that matters is cancellation:
//! a cancelled handle's callback never fires, even when the cancel call
//! races with the timer firing. Each timer carries an atomic flag that is
//! claimed exactly once — by the firing task or by `cancel`, whichever gets
//! there first — so there is no window where both sides proceed.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;

/// Handle to a scheduled timer.
///
/// Handles are plain ids: cheap to copy, safe to hold after the timer has
/// fired (cancelling a fired or already-cancelled timer is a no-op).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

struct TimerEntry {
    /// Set by whichever side (fire or cancel) claims the timer first.
    cancelled: Arc<AtomicBool>,
    /// The driving task; aborted on cancel so periodic timers stop promptly.
    task: tokio::task::JoinHandle<()>,
}

/// Process-wide registry of active timers.
///
/// Construct once (wrapped in [`Arc`]) and share it between the engine's
/// components. Callbacks run on the tokio runtime; they must not block.
pub struct TimerRegistry {
    next_id: AtomicU64,
    timers: Mutex<HashMap<TimerId, TimerEntry>>,
}

impl TimerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(0),
            timers: Mutex::new(HashMap::new()),
        })
    }

    /// Schedules `callback` to run once after `delay`.
    ///
    /// The returned [`TimerId`] can be passed to [`cancel`](Self::cancel)
    /// at any time; if cancellation wins the race against firing, the
    /// callback does not run.
    pub fn schedule<F>(self: &Arc<Self>, delay: Duration, callback: F) -> TimerId
    where
        F: FnOnce() + Send + 'static,
    {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let registry = Arc::downgrade(self);

        // Holding the lock across spawn keeps the entry visible before the
        // task can try to remove itself (relevant for zero delays).
        let mut timers = self.timers.lock();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Claim the firing slot; a cancel that got here first wins.
            if flag.swap(true, Ordering::AcqRel) {
                return;
            }
            if let Some(registry) = registry.upgrade() {
                registry.timers.lock().remove(&id);
            }
            callback();
        });
        timers.insert(id, TimerEntry { cancelled, task });
        id
    }

    /// Schedules `callback` to run every `interval` until cancelled.
    ///
    /// The first invocation happens one full `interval` after scheduling.
    /// The cancellation flag is checked immediately before every invocation,
    /// so a cancel between ticks suppresses all further runs.
    pub fn schedule_repeating<F>(self: &Arc<Self>, interval: Duration, mut callback: F) -> TimerId
    where
        F: FnMut() + Send + 'static,
    {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let mut timers = self.timers.lock();
        let task = tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval completes immediately.
            tick.tick().await;
            loop {
                tick.tick().await;
                if flag.load(Ordering::Acquire) {
                    return;
                }
                callback();
            }
        });
        timers.insert(id, TimerEntry { cancelled, task });
        id
    }

    /// Cancels a timer. Idempotent: unknown, fired, and already-cancelled
    /// ids are all no-ops.
    pub fn cancel(&self, id: TimerId) {
        let entry = self.timers.lock().remove(&id);
        if let Some(entry) = entry {
            let already_claimed = entry.cancelled.swap(true, Ordering::AcqRel);
            entry.task.abort();
            if already_claimed {
                tracing::debug!(%id, "cancel raced with firing; timer had already claimed");
            }
        }
    }

    /// Cancels every outstanding timer. Used at engine shutdown.
    pub fn cancel_all(&self) {
        let entries: Vec<(TimerId, TimerEntry)> = self.timers.lock().drain().collect();
        for (id, entry) in entries {
            entry.cancelled.store(true, Ordering::Release);
            entry.task.abort();
            tracing::debug!(%id, "cancelled at shutdown");
        }
    }

    /// Number of timers currently outstanding (scheduled, not yet fired or
    /// cancelled). Primarily for leak assertions in tests.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.timers.lock().len()
    }
}

impl Drop for TimerRegistry {
    fn drop(&mut self) {
        for (_, entry) in self.timers.get_mut().drain() {
            entry.cancelled.store(true, Ordering::Release);
            entry.task.abort();
        }
    }
}
