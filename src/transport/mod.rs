//! Transport layer.
//!
//! The session talks to the network only through the [`Transport`] and
//! [`TransportHandle`] traits. [`WsTransport`] is the tokio-tungstenite
//! implementation.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐  open(id, url, on_event)  ┌──────────────────────┐
//! │ ConnectionSession │──────────────────────────►│ WsTransport          │
//! │                   │                           │  spawns event loop   │
//! │  handle.send_text │──── HandleCommand ───────►│  ┌────────────────┐  │
//! │  handle.close     │                           │  │ tokio task     │  │    WebSocket
//! │                   │◄──── TransportEvent ──────│  │ select! loop   │◄─┼──────────────► server
//! └───────────────────┘                           │  └────────────────┘  │
//!                                                 └──────────────────────┘
//! ```
//!
//! # Contract
//!
//! - `open` returns immediately; the outcome arrives later as an event.
//! - Events for one handle are delivered in order, from the transport's own
//!   task, never from inside `open`, `send_text` or `close`.
//! - `Closed` or `Failure` is the last event of a handle.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket transport and per-handle event loop |
//! | `endpoint` | Endpoint URL resolution |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use crate::identifiers::ConnectionId;
use crate::protocol::TransportEvent;

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket transport and event loop.
pub mod connection;

/// Endpoint resolution.
pub mod endpoint;

#[cfg(test)]
pub(crate) mod mock;

#[cfg(test)]
pub(crate) mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::WsTransport;

// ============================================================================
// Types
// ============================================================================

/// Event callback handed to [`Transport::open`].
///
/// Called once per event, in delivery order.
pub type EventHandler = Arc<dyn Fn(TransportEvent) + Send + Sync>;

// ============================================================================
// Traits
// ============================================================================

/// Opens connections and owns the infrastructure that drives them.
pub trait Transport: Send + Sync {
    /// Starts connecting to `endpoint` and returns a handle at once.
    ///
    /// Resolution and handshake errors are reported through `on_event` as
    /// [`TransportEvent::Failure`].
    fn open(
        &self,
        id: ConnectionId,
        endpoint: &str,
        on_event: EventHandler,
    ) -> Box<dyn TransportHandle>;

    /// Stops all background work. Safe to call more than once.
    fn shutdown(&self);
}

/// Write side of one open (or opening) connection.
pub trait TransportHandle: Send + Sync {
    /// Queues a text frame. Returns `false` if the connection is already gone.
    fn send_text(&self, text: &str) -> bool;

    /// Requests a graceful close. Returns `false` if the connection is already gone.
    fn close(&self, code: u16, reason: &str) -> bool;
}
