//! Connection session.
//!
//! [`ConnectionSession`] owns at most one transport handle, the connection
//! state and the message log. It is the only place where network state is
//! mutated.
//!
//! # Synchronization
//!
//! State and handle live behind a single mutex. Intents (`connect`,
//! `disconnect`, `send`, `shutdown`) and transport events all take that lock,
//! so a `send` racing a close either transmits before the close is processed
//! or is dropped after it. Observers read through `watch` channels and never
//! touch the lock.
//!
//! # Example
//!
//! ```no_run
//! use ws_session::{ConnectionSession, Result, SessionConfig};
//!
//! # async fn example() -> Result<()> {
//! let session = ConnectionSession::new(SessionConfig::new().with_endpoint("ws://127.0.0.1:9001"))?;
//! let mut state = session.connection_state();
//!
//! session.connect("ws://127.0.0.1:9001");
//! let _ = state.wait_for(|s| s.is_connected()).await;
//!
//! session.send("hello");
//! session.disconnect();
//! session.shutdown();
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::error::{Result, TransportFailure};
use crate::identifiers::{ConnectionId, SessionId};
use crate::protocol::{CLOSE_NORMAL, Message, MessageLog, TransportEvent};
use crate::transport::{EventHandler, Transport, TransportHandle, WsTransport};

use super::config::SessionConfig;
use super::state::ConnectionState;

// ============================================================================
// Types
// ============================================================================

/// The handle currently owned by the session.
struct Attachment {
    /// ID the handle was opened with.
    id: ConnectionId,
    /// Write side of the connection.
    handle: Box<dyn TransportHandle>,
}

/// State guarded by the session lock.
struct SessionState {
    /// Authoritative connection state.
    status: ConnectionState,
    /// Current transport handle, if any.
    current: Option<Attachment>,
}

/// Internal shared state for a session.
struct SessionInner {
    /// Session identifier for logs.
    id: SessionId,
    /// Session settings.
    config: SessionConfig,
    /// Transport used to open connections.
    transport: Arc<dyn Transport>,
    /// Single synchronization point for state and handle.
    state: Mutex<SessionState>,
    /// Published connection state.
    status_tx: watch::Sender<ConnectionState>,
    /// Published message log.
    log_tx: watch::Sender<MessageLog>,
    /// Published last transport failure.
    error_tx: watch::Sender<Option<TransportFailure>>,
    /// Shutdown flag.
    shut_down: AtomicBool,
}

// ============================================================================
// ConnectionSession
// ============================================================================

/// Manages one logical WebSocket connection and its observable state.
///
/// All intents return immediately; their outcome is observed through
/// [`connection_state`](Self::connection_state),
/// [`messages`](Self::messages) and [`last_error`](Self::last_error).
pub struct ConnectionSession {
    /// Shared inner state.
    inner: Arc<SessionInner>,
}

// ============================================================================
// ConnectionSession - Display
// ============================================================================

impl fmt::Debug for ConnectionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSession")
            .field("id", &self.inner.id)
            .field("state", &*self.inner.status_tx.borrow())
            .field("messages", &self.inner.log_tx.borrow().len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ConnectionSession - Constructors
// ============================================================================

impl ConnectionSession {
    /// Creates a session backed by [`WsTransport`] on the current runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) if `config` is invalid
    /// - [`Error::NoRuntime`](crate::Error::NoRuntime) outside a tokio runtime
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let transport = WsTransport::new()?.with_close_timeout(config.close_timeout);
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a session on top of an arbitrary transport.
    #[must_use]
    pub fn with_transport(config: SessionConfig, transport: Arc<dyn Transport>) -> Self {
        let (status_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (log_tx, _) = watch::channel(MessageLog::new());
        let (error_tx, _) = watch::channel(None);

        let inner = Arc::new(SessionInner {
            id: SessionId::new(),
            config,
            transport,
            state: Mutex::new(SessionState {
                status: ConnectionState::Disconnected,
                current: None,
            }),
            status_tx,
            log_tx,
            error_tx,
            shut_down: AtomicBool::new(false),
        });

        debug!(session_id = %inner.id, "Session created");

        Self { inner }
    }
}

// ============================================================================
// ConnectionSession - Observables
// ============================================================================

impl ConnectionSession {
    /// Returns the session ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    /// Returns the session settings.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Subscribes to the connection state. The current value is available
    /// immediately.
    #[must_use]
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.status_tx.subscribe()
    }

    /// Subscribes to the message log.
    #[must_use]
    pub fn messages(&self) -> watch::Receiver<MessageLog> {
        self.inner.log_tx.subscribe()
    }

    /// Subscribes to the most recent transport failure. Cleared on open.
    #[must_use]
    pub fn last_error(&self) -> watch::Receiver<Option<TransportFailure>> {
        self.inner.error_tx.subscribe()
    }

    /// Returns `true` if the session is connected right now.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.status_tx.borrow().is_connected()
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has run.
    #[inline]
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }
}

// ============================================================================
// ConnectionSession - Intents
// ============================================================================

impl ConnectionSession {
    /// Opens a connection to `endpoint`.
    ///
    /// Any existing handle is closed first. The result arrives as an open or
    /// failure event; malformed endpoints fail asynchronously too.
    pub fn connect(&self, endpoint: &str) {
        let inner = &self.inner;
        let mut state = inner.state.lock();

        if inner.shut_down.load(Ordering::SeqCst) {
            warn!(session_id = %inner.id, "Connect after shutdown ignored");
            return;
        }

        if let Some(previous) = state.current.take() {
            debug!(
                session_id = %inner.id,
                connection_id = %previous.id,
                "Closing previous connection before reconnect"
            );
            previous.handle.close(CLOSE_NORMAL, &inner.config.close_reason);
        }
        inner.set_status(&mut state, ConnectionState::Disconnected);

        let id = ConnectionId::next();
        let handle = inner
            .transport
            .open(id, endpoint, event_handler(Arc::downgrade(inner), id));
        state.current = Some(Attachment { id, handle });

        info!(session_id = %inner.id, connection_id = %id, endpoint, "Connecting");
    }

    /// Requests a normal closure of the current connection.
    ///
    /// No-op when no handle is held.
    pub fn disconnect(&self) {
        let inner = &self.inner;
        let state = inner.state.lock();

        match &state.current {
            Some(current) => {
                info!(
                    session_id = %inner.id,
                    connection_id = %current.id,
                    reason = %inner.config.close_reason,
                    "Disconnecting"
                );
                current
                    .handle
                    .close(CLOSE_NORMAL, &inner.config.close_reason);
            }
            None => debug!(session_id = %inner.id, "Disconnect without connection"),
        }
    }

    /// Sends `text` and logs it, if connected. Dropped silently otherwise.
    pub fn send(&self, text: impl Into<String>) {
        let inner = &self.inner;
        let state = inner.state.lock();

        if !inner.transmit(&state, text.into()) {
            debug!(session_id = %inner.id, "Send dropped: not connected");
        }
    }

    /// Releases the transport so no background work survives.
    ///
    /// Idempotent. Also runs when the session is dropped.
    pub fn shutdown(&self) {
        let inner = &self.inner;
        if inner.shut_down.swap(true, Ordering::SeqCst) {
            debug!(session_id = %inner.id, "Session already shut down");
            return;
        }

        {
            let mut state = inner.state.lock();
            if let Some(current) = state.current.take() {
                current
                    .handle
                    .close(CLOSE_NORMAL, &inner.config.close_reason);
            }
            inner.set_status(&mut state, ConnectionState::Disconnected);
        }

        inner.transport.shutdown();

        info!(session_id = %inner.id, "Session shut down");
    }
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// SessionInner - Event Handling
// ============================================================================

/// Builds the callback for the handle opened as `id`.
fn event_handler(session: Weak<SessionInner>, id: ConnectionId) -> EventHandler {
    Arc::new(move |event| {
        if let Some(inner) = session.upgrade() {
            inner.handle_event(id, event);
        }
    })
}

impl SessionInner {
    /// Applies a transport event to the session.
    fn handle_event(&self, id: ConnectionId, event: TransportEvent) {
        let mut state = self.state.lock();

        if state.current.as_ref().map(|c| c.id) != Some(id) {
            debug!(
                session_id = %self.id,
                connection_id = %id,
                event = event.name(),
                "Ignoring event from stale connection"
            );
            return;
        }

        let terminal = event.is_terminal();

        match event {
            TransportEvent::Open => {
                info!(session_id = %self.id, connection_id = %id, "Connected");
                self.set_status(&mut state, ConnectionState::Connected);
                self.error_tx.send_if_modified(|last| last.take().is_some());

                if let Some(hello) = &self.config.hello_message {
                    self.transmit(&state, hello.clone());
                }
            }

            TransportEvent::Text(text) => {
                trace!(session_id = %self.id, len = text.len(), "Frame received");
                self.append(Message::inbound(text));
            }

            TransportEvent::Closing { code, reason } => {
                debug!(session_id = %self.id, connection_id = %id, code, reason = %reason, "Closing");
            }

            TransportEvent::Closed { code, reason } => {
                info!(session_id = %self.id, connection_id = %id, code, reason = %reason, "Disconnected");
            }

            TransportEvent::Failure(failure) => {
                warn!(session_id = %self.id, connection_id = %id, error = %failure, "Connection failed");
                self.error_tx.send_replace(Some(failure));
            }
        }

        // The handle is spent after a terminal event.
        if terminal {
            state.current = None;
            self.set_status(&mut state, ConnectionState::Disconnected);
        }
    }

    /// Transmits and logs `text` if connected. Caller holds the lock.
    fn transmit(&self, state: &SessionState, text: String) -> bool {
        let Some(current) = &state.current else {
            return false;
        };

        if !state.status.is_connected() || !current.handle.send_text(&text) {
            return false;
        }

        trace!(session_id = %self.id, len = text.len(), "Frame sent");
        self.append(Message::outbound(text));
        true
    }

    /// Appends an entry to the published log.
    fn append(&self, message: Message) {
        self.log_tx.send_modify(|log| log.push(message));
    }

    /// Updates the state and notifies observers on change.
    fn set_status(&self, state: &mut SessionState, status: ConnectionState) {
        state.status = status;
        self.status_tx.send_if_modified(|published| {
            if *published == status {
                return false;
            }
            *published = status;
            true
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
