//! Identity of the local user.
//!
//! The conversation facade stamps the current user's [`SenderId`] into
//! every outgoing message; it never writes identity state, only reads it.

use chirp_core::message::SenderId;

/// Read-only supplier of the local user's identity.
pub trait IdentityProvider: Send + Sync {
    /// The sender id stamped into outgoing messages.
    fn sender_id(&self) -> SenderId;

    /// Human-readable display name for the current user.
    fn display_name(&self) -> &str;
}

/// Fixed identity resolved at session start.
#[derive(Debug, Clone)]
pub struct LocalIdentity {
    sender_id: SenderId,
    display_name: String,
}

impl LocalIdentity {
    /// Creates an identity from a sender id and display name.
    pub fn new(sender_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            sender_id: SenderId::new(sender_id),
            display_name: display_name.into(),
        }
    }
}

impl IdentityProvider for LocalIdentity {
    fn sender_id(&self) -> SenderId {
        self.sender_id.clone()
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }
}
