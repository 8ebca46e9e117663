//! `Chirp` — optimistic message delivery and toast notification engine.

pub mod chat;
pub mod config;
pub mod identity;
pub mod notify;
pub mod timer;
pub mod transport;
