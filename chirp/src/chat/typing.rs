//! Per-conversation typing indicator with debounced auto-expiry.
//!
//! State machine per conversation: `idle -> typing -> idle`. Repeated
//! [`notify_typing`](TypingTracker::notify_typing) calls while typing
//! cancel the previous expiry timer and schedule a fresh one — never two
//! timers per conversation, never an early expiry.
//!
//! Each scheduled expiry carries a generation number. A timer that fires
//! after losing the race against a newer `notify_typing` finds a different
//! generation recorded and does nothing, so a stale expiry can never flip a
//! freshly refreshed indicator back to idle.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use chirp_core::message::ConversationId;

use crate::timer::{TimerId, TimerRegistry};

/// Callback invoked on every `idle <-> typing` transition.
pub type TypingChangeFn = Box<dyn Fn(&ConversationId, bool) + Send + Sync>;

/// Pending expiry for one conversation; presence in the map means typing.
struct TypingState {
    generation: u64,
    timer: TimerId,
}

struct TrackerInner {
    states: Mutex<HashMap<ConversationId, TypingState>>,
    on_change: TypingChangeFn,
}

/// Tracks which conversations currently have the local user typing.
pub struct TypingTracker {
    registry: Arc<TimerRegistry>,
    timeout: Duration,
    generations: AtomicU64,
    inner: Arc<TrackerInner>,
}

impl TypingTracker {
    /// Creates a tracker whose indicators expire `timeout` after the last
    /// keystroke. `on_change` fires on every transition (true = started
    /// typing, false = expired back to idle).
    pub fn new(registry: Arc<TimerRegistry>, timeout: Duration, on_change: TypingChangeFn) -> Self {
        Self {
            registry,
            timeout,
            generations: AtomicU64::new(0),
            inner: Arc::new(TrackerInner {
                states: Mutex::new(HashMap::new()),
                on_change,
            }),
        }
    }

    /// Signals a keystroke in `conversation`.
    ///
    /// Idle conversations transition to typing (emitting the change);
    /// already-typing conversations just get their expiry debounced. Either
    /// way the previous pending timer, if any, is cancelled before the new
    /// one is scheduled.
    pub fn notify_typing(&self, conversation: &ConversationId) {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let newly_typing;
        {
            let mut states = self.inner.states.lock();
            let previous = states.remove(conversation);
            newly_typing = previous.is_none();
            if let Some(previous) = previous {
                self.registry.cancel(previous.timer);
            }

            let inner = Arc::downgrade(&self.inner);
            let conv = conversation.clone();
            let timer = self.registry.schedule(self.timeout, move || {
                let Some(inner) = inner.upgrade() else { return };
                let expired = {
                    let mut states = inner.states.lock();
                    let current = states
                        .get(&conv)
                        .is_some_and(|state| state.generation == generation);
                    if current {
                        states.remove(&conv);
                    }
                    current
                };
                if expired {
                    tracing::debug!(conversation = %conv, "typing indicator expired");
                    (inner.on_change)(&conv, false);
                }
            });
            states.insert(conversation.clone(), TypingState { generation, timer });
        }

        if newly_typing {
            tracing::debug!(conversation = %conversation, "typing started");
            (self.inner.on_change)(conversation, true);
        }
    }

    /// Whether the conversation is currently in the typing state.
    #[must_use]
    pub fn is_typing(&self, conversation: &ConversationId) -> bool {
        self.inner.states.lock().contains_key(conversation)
    }
}

impl Drop for TypingTracker {
    fn drop(&mut self) {
        for (_, state) in self.inner.states.lock().drain() {
            self.registry.cancel(state.timer);
        }
    }
}
