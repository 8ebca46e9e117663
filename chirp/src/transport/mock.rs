//! Simulated transport for tests and the demo binary.
//!
//! Delivery sleeps for a configurable latency, then succeeds unless a
//! failure has been scripted via [`MockTransport::fail_next`] or
//! [`MockTransport::set_always_fail`]. Successful deliveries are logged so
//! tests can assert on what actually went out.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use chirp_core::message::{ConversationId, DeliveryAck, Message, MessageId, Timestamp};

use super::{Transport, TransportError};

/// In-process transport with scripted outcomes.
pub struct MockTransport {
    /// Simulated round-trip latency applied to every delivery.
    latency: Duration,
    /// Number of upcoming deliveries that should fail.
    fail_next: AtomicUsize,
    /// When set, every delivery fails until cleared.
    always_fail: AtomicBool,
    /// Ids of successfully delivered messages, in delivery order.
    delivered: Mutex<Vec<MessageId>>,
}

impl MockTransport {
    /// Creates a transport with the given simulated latency.
    #[must_use]
    pub const fn new(latency: Duration) -> Self {
        Self {
            latency,
            fail_next: AtomicUsize::new(0),
            always_fail: AtomicBool::new(false),
            delivered: Mutex::new(Vec::new()),
        }
    }

    /// Script the next `count` deliveries to fail.
    pub fn fail_next(&self, count: usize) {
        self.fail_next.fetch_add(count, Ordering::AcqRel);
    }

    /// Make every delivery fail (or stop failing) from now on.
    pub fn set_always_fail(&self, fail: bool) {
        self.always_fail.store(fail, Ordering::Release);
    }

    /// Ids of messages delivered so far, in delivery order.
    #[must_use]
    pub fn delivered(&self) -> Vec<MessageId> {
        self.delivered.lock().clone()
    }

    /// Consumes one scripted failure, if any is pending.
    fn take_scripted_failure(&self) -> bool {
        if self.always_fail.load(Ordering::Acquire) {
            return true;
        }
        let mut current = self.fail_next.load(Ordering::Acquire);
        while current > 0 {
            match self.fail_next.compare_exchange(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
        false
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new(Duration::from_millis(20))
    }
}

impl Transport for MockTransport {
    async fn deliver(
        &self,
        conversation: &ConversationId,
        message: &Message,
    ) -> Result<DeliveryAck, TransportError> {
        tokio::time::sleep(self.latency).await;

        if self.take_scripted_failure() {
            tracing::debug!(
                conversation = %conversation,
                message_id = %message.id,
                "simulated delivery failure"
            );
            return Err(TransportError::Rejected("simulated failure".into()));
        }

        self.delivered.lock().push(message.id.clone());
        Ok(DeliveryAck {
            message_id: message.id.clone(),
            timestamp: Timestamp::now(),
        })
    }
}
