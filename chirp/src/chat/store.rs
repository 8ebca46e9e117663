//! Per-conversation message storage with optimistic sequencing.
//!
//! The store owns every [`Message`] mutation. Each conversation holds its
//! messages behind its own mutex, so sequence assignment is atomic and in
//! caller order: no two messages in a conversation ever share a sequence
//! value, and a sequence is never reused — not even when a failed message
//! is removed and retried.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use chirp_core::content::{ContentError, sanitize_body};
use chirp_core::message::{
    ConversationId, Message, MessageId, MessageStatus, SenderId, Timestamp,
};

/// Live state for one conversation.
struct ConversationEntry {
    /// Messages in ascending `sequence` order. Appending with a freshly
    /// assigned sequence keeps this sorted structurally.
    messages: Vec<Message>,
    /// Next sequence to assign. Strictly increasing, starts at 1.
    next_sequence: u64,
}

impl ConversationEntry {
    const fn new() -> Self {
        Self {
            messages: Vec::new(),
            next_sequence: 1,
        }
    }

    /// Assigns the next sequence number.
    fn take_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }
}

/// In-memory store of all conversations.
///
/// Consumers never see the live entries — reads go through
/// [`snapshot`](MessageStore::snapshot), which clones.
pub struct MessageStore {
    conversations: RwLock<HashMap<ConversationId, Arc<Mutex<ConversationEntry>>>>,
}

impl MessageStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
        }
    }

    /// Fetches (or lazily creates) the entry for a conversation.
    fn entry(&self, conversation: &ConversationId) -> Arc<Mutex<ConversationEntry>> {
        if let Some(entry) = self.conversations.read().get(conversation) {
            return Arc::clone(entry);
        }
        let mut conversations = self.conversations.write();
        Arc::clone(
            conversations
                .entry(conversation.clone())
                .or_insert_with(|| Arc::new(Mutex::new(ConversationEntry::new()))),
        )
    }

    /// Fetches the entry for a conversation without creating it.
    fn existing_entry(
        &self,
        conversation: &ConversationId,
    ) -> Option<Arc<Mutex<ConversationEntry>>> {
        self.conversations.read().get(conversation).cloned()
    }

    /// Inserts a locally-authored message optimistically.
    ///
    /// Sanitizes `raw_body`, assigns the conversation's next sequence, and
    /// inserts with `status = Pending`. Returns the inserted message
    /// synchronously, before any transport work happens.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError`] if the sanitized body is empty or
    /// oversized; nothing enters the store in that case.
    pub fn send_optimistic(
        &self,
        conversation: &ConversationId,
        sender: SenderId,
        raw_body: &str,
    ) -> Result<Message, ContentError> {
        let body = sanitize_body(raw_body)?;
        let entry = self.entry(conversation);
        let mut entry = entry.lock();
        let message = Message {
            id: MessageId::new(),
            conversation_id: conversation.clone(),
            sender_id: sender,
            body,
            sequence: entry.take_sequence(),
            created_at: Timestamp::now(),
            status: MessageStatus::Pending,
        };
        entry.messages.push(message.clone());
        tracing::debug!(
            conversation = %conversation,
            message_id = %message.id,
            sequence = message.sequence,
            "optimistic insert"
        );
        Ok(message)
    }

    /// Inserts an externally-originated message.
    ///
    /// Same sanitization and sequencing as an optimistic send, but the
    /// message enters as `Sent` — it was already delivered to us.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError`] if the sanitized body is empty or oversized.
    pub fn receive_inbound(
        &self,
        conversation: &ConversationId,
        sender: SenderId,
        raw_body: &str,
    ) -> Result<Message, ContentError> {
        let body = sanitize_body(raw_body)?;
        let entry = self.entry(conversation);
        let mut entry = entry.lock();
        let message = Message {
            id: MessageId::new(),
            conversation_id: conversation.clone(),
            sender_id: sender,
            body,
            sequence: entry.take_sequence(),
            created_at: Timestamp::now(),
            status: MessageStatus::Sent,
        };
        entry.messages.push(message.clone());
        Ok(message)
    }

    /// Transitions a message `Pending -> Sent`.
    ///
    /// Returns `true` if the transition happened. Unknown ids and messages
    /// that already left `Pending` are no-ops, not errors — the transport
    /// resolution can race with removal.
    pub fn confirm_sent(&self, conversation: &ConversationId, id: &MessageId) -> bool {
        self.transition(conversation, id, MessageStatus::Sent)
    }

    /// Transitions a message `Pending -> Failed`.
    ///
    /// Returns `true` if the transition happened; failure never removes the
    /// message from history.
    pub fn mark_failed(&self, conversation: &ConversationId, id: &MessageId) -> bool {
        self.transition(conversation, id, MessageStatus::Failed)
    }

    fn transition(&self, conversation: &ConversationId, id: &MessageId, to: MessageStatus) -> bool {
        let Some(entry) = self.existing_entry(conversation) else {
            return false;
        };
        let mut entry = entry.lock();
        let Some(message) = entry.messages.iter_mut().find(|m| m.id == *id) else {
            tracing::debug!(message_id = %id, status = %to, "transition on unknown message ignored");
            return false;
        };
        if message.status != MessageStatus::Pending {
            return false;
        }
        message.status = to;
        tracing::debug!(message_id = %id, status = %to, "status transition");
        true
    }

    /// Retries a failed message.
    ///
    /// Removes the failed entry and re-inserts the same sender and body as
    /// a logically new send: new id, new (strictly greater) sequence,
    /// `status = Pending`. Both steps happen under the conversation lock so
    /// no snapshot can observe the gap. Returns `None` when the id is
    /// unknown or the message is not `Failed` (a no-op, per the race rules).
    pub fn retry(&self, conversation: &ConversationId, id: &MessageId) -> Option<Message> {
        let entry = self.existing_entry(conversation)?;
        let mut entry = entry.lock();
        let pos = entry
            .messages
            .iter()
            .position(|m| m.id == *id && m.status == MessageStatus::Failed)?;
        let failed = entry.messages.remove(pos);
        let message = Message {
            id: MessageId::new(),
            conversation_id: conversation.clone(),
            sender_id: failed.sender_id,
            body: failed.body,
            sequence: entry.take_sequence(),
            created_at: Timestamp::now(),
            status: MessageStatus::Pending,
        };
        entry.messages.push(message.clone());
        tracing::debug!(
            conversation = %conversation,
            old_id = %id,
            new_id = %message.id,
            sequence = message.sequence,
            "retry re-inserted as new send"
        );
        Some(message)
    }

    /// Read-only snapshot of a conversation, ascending by sequence.
    ///
    /// Unknown conversations yield an empty list.
    #[must_use]
    pub fn snapshot(&self, conversation: &ConversationId) -> Vec<Message> {
        self.existing_entry(conversation)
            .map(|entry| entry.lock().messages.clone())
            .unwrap_or_default()
    }

    /// Current status of one message, if it is still present.
    #[must_use]
    pub fn message_status(
        &self,
        conversation: &ConversationId,
        id: &MessageId,
    ) -> Option<MessageStatus> {
        let entry = self.existing_entry(conversation)?;
        let entry = entry.lock();
        entry.messages.iter().find(|m| m.id == *id).map(|m| m.status)
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}
