//! `Chirp` — domain types for the optimistic message and notification engine.

pub mod content;
pub mod message;
pub mod notification;
