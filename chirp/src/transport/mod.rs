//! Transport abstraction for message delivery.
//!
//! Defines the [`Transport`] trait the conversation facade hands each
//! optimistic message to. There is no real network here — the engine is
//! specified against an in-process boundary — so the shipped implementation
//! is [`mock::MockTransport`], which simulates latency and scripted
//! failures.

pub mod mock;

use chirp_core::message::{ConversationId, DeliveryAck, Message};

/// Errors that can occur during delivery.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection to the backend has been closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Delivery timed out before an acknowledgment arrived.
    #[error("delivery timed out")]
    Timeout,

    /// The backend rejected the message.
    #[error("delivery rejected: {0}")]
    Rejected(String),
}

/// Async delivery trait consumed by the conversation facade.
///
/// The facade calls [`deliver`](Transport::deliver) after the optimistic
/// insert; an `Ok` acknowledgment transitions the message to `Sent`, an
/// `Err` to `Failed`. Each call is at-most-once: the transport never retries
/// internally, a failed attempt is retried only by explicit user action.
pub trait Transport: Send + Sync {
    /// Attempt to deliver one message.
    ///
    /// Resolves with a [`DeliveryAck`] on success. The returned future is
    /// awaited off the caller's path (the facade spawns it), so
    /// implementations may take as long as a real round trip would.
    fn deliver(
        &self,
        conversation: &ConversationId,
        message: &Message,
    ) -> impl std::future::Future<Output = Result<DeliveryAck, TransportError>> + Send;
}
