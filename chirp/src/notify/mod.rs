//! Transient notification (toast) queue with countdown auto-dismissal.
//!
//! Producers [`enqueue`](NotificationQueue::enqueue) a toast and get its id
//! back immediately; the queue owns everything after that. Timed toasts are
//! driven by a repeating tick from the [`TimerRegistry`] that recomputes
//! `remaining_percent` from elapsed wall time and auto-dismisses exactly
//! once at zero. Dismissal — manual, undo-triggered, or automatic — always
//! cancels the toast's tick timer in the same step, so a dead toast can
//! never tick again.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use chirp_core::notification::{Notification, NotificationId, NotificationKind};

use crate::timer::{TimerId, TimerRegistry};

/// Undo action attached to a toast. Invoked at most once.
pub type UndoFn = Box<dyn FnOnce() + Send>;

/// Options accepted by [`NotificationQueue::enqueue`].
///
/// `duration_ms` semantics: `None` means "use the kind's default"
/// (4000 ms, 6000 ms for errors); an explicit `Some(0)` makes the toast
/// persistent until manually dismissed.
#[derive(Default)]
pub struct EnqueueOptions {
    /// Heading override; the kind's default title when absent.
    pub title: Option<String>,
    /// Auto-dismiss duration override in milliseconds.
    pub duration_ms: Option<u64>,
    /// Undo action; its presence sets `can_undo` on the snapshot.
    pub on_undo: Option<UndoFn>,
}

impl EnqueueOptions {
    /// Options with an explicit duration.
    #[must_use]
    pub fn with_duration_ms(duration_ms: u64) -> Self {
        Self {
            duration_ms: Some(duration_ms),
            ..Self::default()
        }
    }

    /// Options carrying an undo action.
    #[must_use]
    pub fn with_undo(on_undo: UndoFn) -> Self {
        Self {
            on_undo: Some(on_undo),
            ..Self::default()
        }
    }
}

/// A live toast: the public snapshot plus the queue-private countdown state.
struct ActiveToast {
    notification: Notification,
    started_at: Instant,
    timer: Option<TimerId>,
    on_undo: Option<UndoFn>,
}

struct QueueInner {
    /// Active toasts in insertion order.
    toasts: Mutex<Vec<ActiveToast>>,
}

/// Ordered collection of active toast notifications.
pub struct NotificationQueue {
    registry: Arc<TimerRegistry>,
    tick_interval: Duration,
    inner: Arc<QueueInner>,
}

/// Countdown tick granularity used when none is configured.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on the tick granularity; coarser ticks make countdown bars
/// visibly jerky, so configured values are clamped to this.
pub const MAX_TICK_INTERVAL: Duration = Duration::from_millis(200);

impl NotificationQueue {
    /// Creates a queue driving its countdowns through `registry`.
    ///
    /// `tick_interval` is clamped to [`MAX_TICK_INTERVAL`].
    #[must_use]
    pub fn new(registry: Arc<TimerRegistry>, tick_interval: Duration) -> Self {
        let clamped = if tick_interval > MAX_TICK_INTERVAL {
            tracing::warn!(
                configured_ms = tick_interval.as_millis() as u64,
                max_ms = MAX_TICK_INTERVAL.as_millis() as u64,
                "notification tick interval clamped"
            );
            MAX_TICK_INTERVAL
        } else {
            tick_interval
        };
        Self {
            registry,
            tick_interval: clamped,
            inner: Arc::new(QueueInner {
                toasts: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Adds a toast and returns its id immediately.
    ///
    /// Timed toasts start their countdown now; persistent toasts (resolved
    /// duration of zero) stay until dismissed.
    pub fn enqueue(
        &self,
        kind: NotificationKind,
        message: impl Into<String>,
        options: EnqueueOptions,
    ) -> NotificationId {
        let id = NotificationId::new();
        let title = options
            .title
            .unwrap_or_else(|| kind.default_title().to_string());
        let duration_ms = match options.duration_ms {
            None => Some(kind.default_duration_ms()),
            Some(0) => None,
            Some(ms) => Some(ms),
        };

        let notification = Notification {
            id: id.clone(),
            kind,
            title,
            message: message.into(),
            duration_ms,
            remaining_percent: 100.0,
            can_undo: options.on_undo.is_some(),
        };
        tracing::debug!(notification_id = %id, kind = %kind, "toast enqueued");

        // The toasts lock is held across scheduling so the tick callback
        // (which locks toasts first) cannot observe the toast without its
        // timer id recorded.
        let mut toasts = self.inner.toasts.lock();
        toasts.push(ActiveToast {
            notification,
            started_at: Instant::now(),
            timer: None,
            on_undo: options.on_undo,
        });

        if let Some(ms) = duration_ms {
            let timer = self.start_countdown(id.clone(), Duration::from_millis(ms));
            if let Some(toast) = toasts.iter_mut().find(|t| t.notification.id == id) {
                toast.timer = Some(timer);
            }
        }
        id
    }

    /// Schedules the repeating countdown tick for one toast.
    fn start_countdown(&self, id: NotificationId, duration: Duration) -> TimerId {
        let inner = Arc::downgrade(&self.inner);
        let registry = Arc::downgrade(&self.registry);

        self.registry.schedule_repeating(self.tick_interval, move || {
            let Some(inner) = inner.upgrade() else { return };

            let expired_timer = {
                let mut toasts = inner.toasts.lock();
                let Some(pos) = toasts.iter().position(|t| t.notification.id == id) else {
                    // Already dismissed; the cancel is racing in.
                    return;
                };
                let toast = &mut toasts[pos];
                let elapsed = toast.started_at.elapsed();
                let fraction = elapsed.as_secs_f32() / duration.as_secs_f32();
                let remaining = ((1.0 - fraction) * 100.0).clamp(0.0, 100.0);
                toast.notification.remaining_percent = remaining;

                if elapsed >= duration {
                    tracing::debug!(notification_id = %id, "toast expired");
                    toasts.remove(pos).timer
                } else {
                    None
                }
            };

            // Removal happened under the lock; cancelling our own tick
            // outside it is what stops any redundant fire.
            if let Some(timer) = expired_timer
                && let Some(registry) = registry.upgrade()
            {
                registry.cancel(timer);
            }
        })
    }

    /// Removes a toast immediately and cancels its countdown.
    ///
    /// Idempotent: dismissing an unknown or already-removed id is a no-op.
    /// A pending undo action is dropped without being invoked.
    pub fn dismiss(&self, id: &NotificationId) {
        let removed = {
            let mut toasts = self.inner.toasts.lock();
            toasts
                .iter()
                .position(|t| t.notification.id == *id)
                .map(|pos| toasts.remove(pos))
        };
        if let Some(toast) = removed {
            if let Some(timer) = toast.timer {
                self.registry.cancel(timer);
            }
            tracing::debug!(notification_id = %id, "toast dismissed");
        }
    }

    /// Invokes a toast's undo action exactly once, then dismisses it.
    ///
    /// Unknown ids, toasts without an undo action, and repeated calls are
    /// all no-ops: removal under the lock means a second caller never finds
    /// the toast, let alone its callback.
    pub fn undo(&self, id: &NotificationId) {
        let removed = {
            let mut toasts = self.inner.toasts.lock();
            toasts
                .iter()
                .position(|t| t.notification.id == *id)
                .map(|pos| toasts.remove(pos))
        };
        let Some(mut toast) = removed else { return };
        if let Some(timer) = toast.timer {
            self.registry.cancel(timer);
        }
        if let Some(on_undo) = toast.on_undo.take() {
            tracing::debug!(notification_id = %id, "undo invoked");
            on_undo();
        }
    }

    /// Snapshot of active toasts in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<Notification> {
        self.inner
            .toasts
            .lock()
            .iter()
            .map(|t| t.notification.clone())
            .collect()
    }

    /// Enqueues a success toast with default title and duration.
    pub fn success(&self, message: impl Into<String>) -> NotificationId {
        self.enqueue(NotificationKind::Success, message, EnqueueOptions::default())
    }

    /// Enqueues an error toast with default title and duration.
    pub fn error(&self, message: impl Into<String>) -> NotificationId {
        self.enqueue(NotificationKind::Error, message, EnqueueOptions::default())
    }

    /// Enqueues a warning toast with default title and duration.
    pub fn warning(&self, message: impl Into<String>) -> NotificationId {
        self.enqueue(NotificationKind::Warning, message, EnqueueOptions::default())
    }

    /// Enqueues an info toast with default title and duration.
    pub fn info(&self, message: impl Into<String>) -> NotificationId {
        self.enqueue(NotificationKind::Info, message, EnqueueOptions::default())
    }
}

impl Drop for NotificationQueue {
    fn drop(&mut self) {
        for toast in self.inner.toasts.lock().drain(..) {
            if let Some(timer) = toast.timer {
                self.registry.cancel(timer);
            }
        }
    }
}
