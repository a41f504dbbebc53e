//! Connection state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether the session currently has an open socket.
///
/// Starts as [`ConnectionState::Disconnected`]; becomes `Connected` only on an
/// open event and returns to `Disconnected` on close or failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Handshake completed, frames can be sent.
    Connected,
    /// No open socket.
    #[default]
    Disconnected,
}

impl ConnectionState {
    /// Returns `true` for [`ConnectionState::Connected`].
    #[inline]
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl From<bool> for ConnectionState {
    fn from(connected: bool) -> Self {
        if connected {
            Self::Connected
        } else {
            Self::Disconnected
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        })
    }
}
