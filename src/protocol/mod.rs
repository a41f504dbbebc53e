//! Session data types shared by the transport and the session.
//!
//! # Overview
//!
//! | Type | Direction | Purpose |
//! |------|-----------|---------|
//! | `TransportEvent` | Transport → Session | Socket lifecycle and inbound frames |
//! | `Message` | Session → Observers | One logged frame |
//! | `MessageLog` | Session → Observers | Ordered frame history |
//!
//! Frames are plain UTF-8 text; there is no sub-protocol or structured payload.

// ============================================================================
// Submodules
// ============================================================================

/// Transport lifecycle events and close codes.
pub mod event;

/// Message log entries.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::{CLOSE_NO_STATUS, CLOSE_NORMAL, MAX_CLOSE_REASON_BYTES, TransportEvent};
pub use message::{Direction, Message, MessageLog};
