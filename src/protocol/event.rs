//! Transport lifecycle events.
//!
//! A transport reports everything that happens on a socket as a
//! [`TransportEvent`], delivered in the order it was observed.
//!
//! | Event | Session reaction |
//! |-------|------------------|
//! | `Open` | state → Connected, send hello |
//! | `Text` | append inbound entry |
//! | `Closing` | none (logged) |
//! | `Closed` | state → Disconnected |
//! | `Failure` | state → Disconnected, publish last error |

// ============================================================================
// Imports
// ============================================================================

use crate::error::TransportFailure;

// ============================================================================
// Close Codes
// ============================================================================

/// Normal closure (RFC 6455 §7.4.1).
pub const CLOSE_NORMAL: u16 = 1000;

/// Reported when a close frame carried no status code.
pub const CLOSE_NO_STATUS: u16 = 1005;

/// Maximum close reason length in bytes (125-byte control payload minus the code).
pub const MAX_CLOSE_REASON_BYTES: usize = 123;

// ============================================================================
// TransportEvent
// ============================================================================

/// A network event reported by a transport handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake completed.
    Open,

    /// A text frame arrived.
    Text(String),

    /// The peer sent a close frame; the socket is shutting down.
    Closing {
        /// Close status code.
        code: u16,
        /// Close reason.
        reason: String,
    },

    /// The close handshake finished and the socket is gone.
    Closed {
        /// Close status code.
        code: u16,
        /// Close reason.
        reason: String,
    },

    /// Connection could not be established or broke without a close handshake.
    Failure(TransportFailure),
}

impl TransportEvent {
    /// Creates a `Closed` event.
    #[inline]
    pub fn closed(code: u16, reason: impl Into<String>) -> Self {
        Self::Closed {
            code,
            reason: reason.into(),
        }
    }

    /// Creates a `Closing` event.
    #[inline]
    pub fn closing(code: u16, reason: impl Into<String>) -> Self {
        Self::Closing {
            code,
            reason: reason.into(),
        }
    }

    /// Creates a `Failure` event.
    #[inline]
    pub fn failure(failure: impl Into<TransportFailure>) -> Self {
        Self::Failure(failure.into())
    }

    /// Returns `true` if no further events follow this one.
    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed { .. } | Self::Failure(_))
    }

    /// Short event name for logging.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Text(_) => "text",
            Self::Closing { .. } => "closing",
            Self::Closed { .. } => "closed",
            Self::Failure(_) => "failure",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
