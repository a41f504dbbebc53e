//! WebSocket session core - UI-agnostic connection and message state.
//!
//! This library owns a single client WebSocket connection and exposes its
//! status and message history as observable state, so any front-end
//! (terminal, web, mobile) can drive it through the same three intents.
//!
//! # Architecture
//!
//! ```text
//! UI ──connect/disconnect/send──► SessionController ──► ConnectionSession ──► Transport ──► server
//! UI ◄──────── watch::Receiver ◄─────────────────────── state / log update ◄── events ◄───┘
//! ```
//!
//! Key design principles:
//!
//! - [`ConnectionSession`] is the only component that mutates network state
//! - State and transport handle change under a single lock
//! - Observers get replay-latest `tokio::sync::watch` receivers
//! - Intents never block and never return errors; failures are observed
//!
//! # Quick Start
//!
//! ```no_run
//! use ws_session::{Result, SessionConfig, SessionController};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let controller = SessionController::from_config(
//!         SessionConfig::new().with_endpoint("wss://echo.websocket.org/"),
//!     )?;
//!
//!     let mut state = controller.connection_state();
//!     controller.connect();
//!     let _ = state.wait_for(|s| s.is_connected()).await;
//!
//!     controller.send("hello");
//!     controller.disconnect();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`controller`] | UI-facing [`SessionController`] |
//! | [`session`] | [`ConnectionSession`], [`SessionConfig`], [`ConnectionState`] |
//! | [`protocol`] | [`Message`], [`MessageLog`], [`TransportEvent`] |
//! | [`transport`] | [`Transport`] seam and [`WsTransport`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Session and connection IDs |

// ============================================================================
// Modules
// ============================================================================

/// UI-facing intent/state adapter.
pub mod controller;

/// Error types and result aliases.
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Messages, message log and transport events.
pub mod protocol;

/// Connection session, configuration and state.
pub mod session;

/// Transport traits and the WebSocket implementation.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Controller
pub use controller::SessionController;

// Error types
pub use error::{Error, Result, TransportFailure};

// Identifier types
pub use identifiers::{ConnectionId, SessionId};

// Protocol types
pub use protocol::{Direction, Message, MessageLog, TransportEvent};

// Session types
pub use session::{ConnectionSession, ConnectionState, SessionConfig};

// Transport types
pub use transport::{EventHandler, Transport, TransportHandle, WsTransport};
