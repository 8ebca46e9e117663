//! Transient notification (toast) types.
//!
//! A [`Notification`] is the immutable snapshot handed to consumers; the
//! queue in the engine crate owns the live state (countdown timer, undo
//! callback) and republishes updated snapshots on every tick.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a notification.
///
/// UUID v7, so creation-time ordered and collision-resistant for the
/// lifetime of the process. Ids are never reused; a dismissed toast's slot
/// can never be confused with a later one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(Uuid);

impl NotificationId {
    /// Creates a new time-ordered notification identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `NotificationId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Severity class of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    /// Neutral informational notice.
    Info,
    /// A completed action.
    Success,
    /// Something worth attention, not an error.
    Warning,
    /// A failed action.
    Error,
}

impl NotificationKind {
    /// Title used when the producer does not supply one.
    #[must_use]
    pub const fn default_title(self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Success => "Success",
            Self::Warning => "Warning",
            Self::Error => "Error",
        }
    }

    /// Auto-dismiss duration used when the producer does not supply one.
    ///
    /// Errors linger longer so they can actually be read.
    #[must_use]
    pub const fn default_duration_ms(self) -> u64 {
        match self {
            Self::Info | Self::Success | Self::Warning => 4000,
            Self::Error => 6000,
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Success => write!(f, "success"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Snapshot of an active toast notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique identifier.
    pub id: NotificationId,
    /// Severity class.
    pub kind: NotificationKind,
    /// Short heading.
    pub title: String,
    /// Display text.
    pub message: String,
    /// Auto-dismiss duration; `None` means the toast persists until
    /// manually dismissed.
    pub duration_ms: Option<u64>,
    /// Countdown progress in `[0, 100]`; 100 at creation, 0 at expiry.
    /// Always 100 for persistent toasts.
    pub remaining_percent: f32,
    /// Whether an undo action is attached.
    pub can_undo: bool,
}
