//! Chat application layer: the conversation facade.
//!
//! [`ChatService`] is the one surface UI collaborators talk to. It combines
//! the message store (sequencing, optimistic inserts, retries) and the
//! typing tracker behind a single API, coordinates the transport, and fans
//! out change events to per-conversation subscribers so consumers never
//! poll.

pub mod store;
pub mod typing;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use chirp_core::content::ContentError;
use chirp_core::message::{ConversationId, Message, MessageId, MessageStatus, SenderId};

use crate::identity::IdentityProvider;
use crate::timer::TimerRegistry;
use crate::transport::Transport;

use store::MessageStore;
use typing::TypingTracker;

/// Chat engine tuning knobs consumed by [`ChatService`].
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// How long after the last keystroke a typing indicator expires.
    pub typing_timeout: std::time::Duration,
    /// Capacity of each subscriber's event channel. Events beyond a full
    /// buffer are dropped for that subscriber rather than blocking the
    /// store.
    pub event_buffer: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            typing_timeout: std::time::Duration::from_millis(3000),
            event_buffer: 64,
        }
    }
}

/// Events emitted to conversation subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// A message entered the conversation (optimistic send, retry, or
    /// inbound arrival).
    MessageAdded {
        /// The inserted message.
        message: Message,
    },
    /// A message's delivery status changed.
    StatusChanged {
        /// The message whose status changed.
        message_id: MessageId,
        /// The new status.
        status: MessageStatus,
    },
    /// The local typing indicator turned on or off.
    TypingChanged {
        /// Whether the user is now typing.
        is_typing: bool,
    },
}

/// Identifies one subscription for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Per-conversation fan-out of [`ChatEvent`]s.
///
/// Emission is best-effort (`try_send`): a subscriber that stops draining
/// its channel loses events, the store never blocks on it. Senders whose
/// receiver was dropped are pruned on the next publish.
struct EventHub {
    subscribers: Mutex<HashMap<ConversationId, Vec<(SubscriptionId, mpsc::Sender<ChatEvent>)>>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl EventHub {
    fn new(buffer: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            buffer,
        }
    }

    fn subscribe(
        &self,
        conversation: &ConversationId,
    ) -> (SubscriptionId, mpsc::Receiver<ChatEvent>) {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.buffer);
        self.subscribers
            .lock()
            .entry(conversation.clone())
            .or_default()
            .push((id, tx));
        (id, rx)
    }

    fn unsubscribe(&self, conversation: &ConversationId, id: SubscriptionId) {
        let mut subscribers = self.subscribers.lock();
        if let Some(list) = subscribers.get_mut(conversation) {
            list.retain(|(sub_id, _)| *sub_id != id);
            if list.is_empty() {
                subscribers.remove(conversation);
            }
        }
    }

    fn publish(&self, conversation: &ConversationId, event: &ChatEvent) {
        let mut subscribers = self.subscribers.lock();
        let Some(list) = subscribers.get_mut(conversation) else {
            return;
        };
        list.retain(|(_, tx)| {
            if tx.is_closed() {
                return false;
            }
            if tx.try_send(event.clone()).is_err() {
                tracing::debug!(conversation = %conversation, "subscriber buffer full, event dropped");
            }
            true
        });
        if list.is_empty() {
            subscribers.remove(conversation);
        }
    }
}

/// Public API surface for conversations, consumed by UI collaborators.
///
/// Owns the message store and typing tracker; all state reaches consumers
/// as immutable snapshots or events. Constructed once per session and
/// shared by reference (`Arc`).
pub struct ChatService<T: Transport, I: IdentityProvider> {
    store: MessageStore,
    typing: TypingTracker,
    transport: Arc<T>,
    identity: I,
    events: Arc<EventHub>,
}

impl<T, I> ChatService<T, I>
where
    T: Transport + 'static,
    I: IdentityProvider + 'static,
{
    /// Creates the facade.
    ///
    /// `registry` drives typing expiry (and is shared with the notification
    /// queue by the caller); `transport` receives every optimistic message
    /// for delivery.
    pub fn new(
        transport: Arc<T>,
        identity: I,
        registry: Arc<TimerRegistry>,
        config: ChatConfig,
    ) -> Arc<Self> {
        let events = Arc::new(EventHub::new(config.event_buffer));
        let typing_events = Arc::clone(&events);
        let typing = TypingTracker::new(
            registry,
            config.typing_timeout,
            Box::new(move |conversation, is_typing| {
                typing_events.publish(conversation, &ChatEvent::TypingChanged { is_typing });
            }),
        );
        Arc::new(Self {
            store: MessageStore::new(),
            typing,
            transport,
            identity,
            events,
        })
    }

    /// Sends a message optimistically.
    ///
    /// The message is inserted (`Pending`) and returned before any
    /// transport work happens; delivery runs on a spawned task and feeds
    /// its outcome back as a `StatusChanged` event (`Sent` or `Failed`).
    /// Transport failures never surface here — only content validation
    /// does.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError`] if the sanitized body is empty or
    /// oversized.
    pub fn send(
        self: &Arc<Self>,
        conversation: &ConversationId,
        raw_body: &str,
    ) -> Result<Message, ContentError> {
        let message =
            self.store
                .send_optimistic(conversation, self.identity.sender_id(), raw_body)?;
        self.events.publish(
            conversation,
            &ChatEvent::MessageAdded {
                message: message.clone(),
            },
        );
        self.spawn_delivery(message.clone());
        Ok(message)
    }

    /// Retries a failed message.
    ///
    /// The failed entry is removed and replaced by a fresh optimistic send
    /// (new id, strictly greater sequence), which is then delivered like
    /// any other. Returns `None` when the id is unknown or not `Failed`.
    pub fn retry(self: &Arc<Self>, conversation: &ConversationId, id: &MessageId) -> Option<Message> {
        let message = self.store.retry(conversation, id)?;
        self.events.publish(
            conversation,
            &ChatEvent::MessageAdded {
                message: message.clone(),
            },
        );
        self.spawn_delivery(message.clone());
        Some(message)
    }

    /// Records an externally-originated message (`Sent` on arrival).
    ///
    /// # Errors
    ///
    /// Returns [`ContentError`] if the sanitized body is empty or
    /// oversized.
    pub fn receive_inbound(
        &self,
        conversation: &ConversationId,
        sender: SenderId,
        raw_body: &str,
    ) -> Result<Message, ContentError> {
        let message = self.store.receive_inbound(conversation, sender, raw_body)?;
        self.events.publish(
            conversation,
            &ChatEvent::MessageAdded {
                message: message.clone(),
            },
        );
        Ok(message)
    }

    /// Signals that the local user is typing in `conversation`.
    pub fn on_typing_start(&self, conversation: &ConversationId) {
        self.typing.notify_typing(conversation);
    }

    /// Whether the local typing indicator is active for `conversation`.
    #[must_use]
    pub fn is_typing(&self, conversation: &ConversationId) -> bool {
        self.typing.is_typing(conversation)
    }

    /// Snapshot of a conversation's messages, ascending by sequence.
    #[must_use]
    pub fn get_messages(&self, conversation: &ConversationId) -> Vec<Message> {
        self.store.snapshot(conversation)
    }

    /// Current status of one message, if still present.
    #[must_use]
    pub fn message_status(
        &self,
        conversation: &ConversationId,
        id: &MessageId,
    ) -> Option<MessageStatus> {
        self.store.message_status(conversation, id)
    }

    /// Subscribes to change events for one conversation.
    ///
    /// Returns the subscription id (for [`unsubscribe`](Self::unsubscribe))
    /// and the receiving end of a bounded event channel. Dropping the
    /// receiver also ends the subscription.
    pub fn subscribe(
        &self,
        conversation: &ConversationId,
    ) -> (SubscriptionId, mpsc::Receiver<ChatEvent>) {
        self.events.subscribe(conversation)
    }

    /// Removes a subscription. Unknown ids are a no-op.
    pub fn unsubscribe(&self, conversation: &ConversationId, id: SubscriptionId) {
        self.events.unsubscribe(conversation, id);
    }

    /// Hands one message to the transport off the caller's path and feeds
    /// the resolution back into the store.
    fn spawn_delivery(self: &Arc<Self>, message: Message) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let conversation = message.conversation_id.clone();
            let status = match service.transport.deliver(&conversation, &message).await {
                Ok(_ack) => MessageStatus::Sent,
                Err(err) => {
                    tracing::warn!(
                        conversation = %conversation,
                        message_id = %message.id,
                        error = %err,
                        "delivery failed"
                    );
                    MessageStatus::Failed
                }
            };
            let applied = match status {
                MessageStatus::Sent => service.store.confirm_sent(&conversation, &message.id),
                _ => service.store.mark_failed(&conversation, &message.id),
            };
            // The message may have been retried away while delivery was in
            // flight; only real transitions are published.
            if applied {
                service.events.publish(
                    &conversation,
                    &ChatEvent::StatusChanged {
                        message_id: message.id,
                        status,
                    },
                );
            }
        });
    }
}
