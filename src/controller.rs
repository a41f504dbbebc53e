//! UI-facing session controller.
//!
//! [`SessionController`] is what a front-end holds: three intents and three
//! read-only observables. Dropping the controller (or calling
//! [`dispose`](SessionController::dispose)) shuts the session down.
//!
//! # Example
//!
//! ```no_run
//! use ws_session::{Result, SessionConfig, SessionController};
//!
//! # async fn example() -> Result<()> {
//! let controller = SessionController::from_config(SessionConfig::new())?;
//! let mut messages = controller.messages();
//!
//! controller.connect();
//! controller.send("hello");
//!
//! while messages.changed().await.is_ok() {
//!     for message in messages.borrow_and_update().iter() {
//!         println!("{} {}", if message.is_outbound() { ">" } else { "<" }, message.text());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::watch;
use tracing::debug;

use crate::error::{Result, TransportFailure};
use crate::protocol::MessageLog;
use crate::session::{ConnectionSession, ConnectionState, SessionConfig};

// ============================================================================
// SessionController
// ============================================================================

/// Intent/state adapter over a [`ConnectionSession`].
#[derive(Debug)]
pub struct SessionController {
    /// The owned session.
    session: ConnectionSession,
}

impl SessionController {
    /// Wraps an existing session.
    #[inline]
    #[must_use]
    pub fn new(session: ConnectionSession) -> Self {
        Self { session }
    }

    /// Creates a controller over a WebSocket-backed session.
    ///
    /// # Errors
    ///
    /// See [`ConnectionSession::new`].
    pub fn from_config(config: SessionConfig) -> Result<Self> {
        ConnectionSession::new(config).map(Self::new)
    }

    // ========================================================================
    // Observables
    // ========================================================================

    /// Connection state, replaying the latest value.
    #[must_use]
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.session.connection_state()
    }

    /// Message log, replaying the latest value.
    #[must_use]
    pub fn messages(&self) -> watch::Receiver<MessageLog> {
        self.session.messages()
    }

    /// Most recent transport failure, if any.
    #[must_use]
    pub fn last_error(&self) -> watch::Receiver<Option<TransportFailure>> {
        self.session.last_error()
    }

    // ========================================================================
    // Intents
    // ========================================================================

    /// Connects to the configured endpoint.
    pub fn connect(&self) {
        self.session.connect(&self.session.config().endpoint);
    }

    /// Disconnects with a normal closure.
    pub fn disconnect(&self) {
        self.session.disconnect();
    }

    /// Sends `text` if connected.
    pub fn send(&self, text: impl Into<String>) {
        self.session.send(text);
    }

    /// Discards the controller, shutting the session down.
    pub fn dispose(self) {
        drop(self);
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        debug!(session_id = %self.session.id(), "Controller disposed");
        self.session.shutdown();
    }
}

// ============================================================================
// Tests
// ============================================================================
