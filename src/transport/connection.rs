//! WebSocket transport and per-handle event loop.
//!
//! # Event Loop
//!
//! Every [`WsTransport::open`] spawns one tokio task that:
//!
//! - Resolves the endpoint and performs the client handshake
//! - Forwards queued commands (text frames, close) to the socket
//! - Reports open, inbound text, closing, closed and failure events
//! - Enforces the close grace period after a local close
//!
//! Live loops are tracked by [`ConnectionId`] so [`WsTransport::shutdown`]
//! can stop all of them. The registry holds only a stop signal, so dropping
//! the [`TransportHandle`] closes the command channel and the loop closes the
//! socket on its own.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::{CLOSE_NO_STATUS, CLOSE_NORMAL, TransportEvent};
use crate::session::config::DEFAULT_CLOSE_TIMEOUT;

use super::endpoint;
use super::{EventHandler, Transport, TransportHandle};

// ============================================================================
// Constants
// ============================================================================

/// Close code sent when the transport shuts down under an open socket.
pub const CLOSE_GOING_AWAY: u16 = 1001;

/// Close reason sent when the transport shuts down.
const SHUTDOWN_REASON: &str = "Transport shut down";

/// Time allowed to flush the going-away frame on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

// ============================================================================
// Types
// ============================================================================

/// Split write half of a client socket.
type WsSink = futures_util::stream::SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Stop signals of live event loops.
type LoopRegistry = FxHashMap<ConnectionId, oneshot::Sender<()>>;

// ============================================================================
// HandleCommand
// ============================================================================

/// Internal commands for the event loop.
enum HandleCommand {
    /// Send a text frame.
    Text(String),
    /// Start the close handshake.
    Close { code: u16, reason: String },
}

// ============================================================================
// WsTransport
// ============================================================================

/// tokio-tungstenite backed [`Transport`].
///
/// Cloning yields another reference to the same set of event loops.
#[derive(Clone)]
pub struct WsTransport {
    inner: Arc<TransportInner>,
}

/// Shared transport state.
struct TransportInner {
    /// Runtime the event loops are spawned on.
    runtime: Handle,
    /// Grace period for the peer's close frame.
    close_timeout: Duration,
    /// Live event loops.
    loops: Mutex<LoopRegistry>,
    /// Shutdown flag.
    shutdown: AtomicBool,
}

impl WsTransport {
    /// Creates a transport on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRuntime`] when called outside a tokio runtime.
    pub fn new() -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| Error::no_runtime(e.to_string()))?;
        Ok(Self::with_runtime(runtime))
    }

    /// Creates a transport that spawns its event loops on `runtime`.
    #[must_use]
    pub fn with_runtime(runtime: Handle) -> Self {
        Self {
            inner: Arc::new(TransportInner {
                runtime,
                close_timeout: DEFAULT_CLOSE_TIMEOUT,
                loops: Mutex::new(LoopRegistry::default()),
                shutdown: AtomicBool::new(false),
            }),
        }
    }

    /// Sets how long a local close waits for the peer's close frame.
    ///
    /// Must be called before the transport is shared.
    #[must_use]
    pub fn with_close_timeout(self, close_timeout: Duration) -> Self {
        let inner = match Arc::try_unwrap(self.inner) {
            Ok(mut inner) => {
                inner.close_timeout = close_timeout;
                inner
            }
            Err(shared) => {
                warn!("Transport already shared, close timeout left unchanged");
                return Self { inner: shared };
            }
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Returns the number of live event loops.
    #[inline]
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner.loops.lock().len()
    }

    /// Returns `true` once [`Transport::shutdown`] has run.
    #[inline]
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.load(Ordering::SeqCst)
    }
}

impl Transport for WsTransport {
    fn open(
        &self,
        id: ConnectionId,
        endpoint: &str,
        on_event: EventHandler,
    ) -> Box<dyn TransportHandle> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();

        {
            // Flag and registry change together under this lock.
            let mut loops = self.inner.loops.lock();
            if self.is_shut_down() {
                debug!(connection_id = %id, "Open after shutdown");
                self.inner.runtime.spawn(async move {
                    on_event(TransportEvent::failure(Error::TransportShutdown));
                });
                return Box::new(WsHandle { id, command_tx });
            }
            loops.insert(id, stop_tx);
        }

        let inner = Arc::clone(&self.inner);
        let endpoint = endpoint.to_string();
        self.inner.runtime.spawn(run_event_loop(
            inner, id, endpoint, command_rx, stop_rx, on_event,
        ));

        Box::new(WsHandle { id, command_tx })
    }

    fn shutdown(&self) {
        let loops: Vec<_> = {
            let mut loops = self.inner.loops.lock();
            if self.inner.shutdown.swap(true, Ordering::SeqCst) {
                debug!("Transport already shut down");
                return;
            }
            loops.drain().collect()
        };
        info!(count = loops.len(), "Transport shutting down");

        for (id, stop_tx) in loops {
            if stop_tx.send(()).is_ok() {
                debug!(connection_id = %id, "Shutdown sent to event loop");
            }
        }
    }
}

// ============================================================================
// WsHandle
// ============================================================================

/// Handle to one event loop.
///
/// Dropping it closes the command channel, which starts a normal close if
/// none was requested.
struct WsHandle {
    id: ConnectionId,
    command_tx: mpsc::UnboundedSender<HandleCommand>,
}

impl TransportHandle for WsHandle {
    fn send_text(&self, text: &str) -> bool {
        let sent = self
            .command_tx
            .send(HandleCommand::Text(text.to_string()))
            .is_ok();
        if !sent {
            trace!(connection_id = %self.id, "Event loop gone, frame not queued");
        }
        sent
    }

    fn close(&self, code: u16, reason: &str) -> bool {
        self.command_tx
            .send(HandleCommand::Close {
                code,
                reason: reason.to_string(),
            })
            .is_ok()
    }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Runs one connection to completion and reports its terminal event.
async fn run_event_loop(
    inner: Arc<TransportInner>,
    id: ConnectionId,
    endpoint: String,
    mut command_rx: mpsc::UnboundedReceiver<HandleCommand>,
    mut stop_rx: oneshot::Receiver<()>,
    on_event: EventHandler,
) {
    let terminal = drive(&inner, id, &endpoint, &mut command_rx, &mut stop_rx, &on_event).await;

    inner.loops.lock().remove(&id);

    if let Some(event) = terminal {
        debug!(connection_id = %id, event = event.name(), "Connection finished");
        on_event(event);
    }

    debug!(connection_id = %id, "Event loop terminated");
}

/// Connects, then serves the socket. Returns the terminal event, if any.
async fn drive(
    inner: &TransportInner,
    id: ConnectionId,
    endpoint: &str,
    command_rx: &mut mpsc::UnboundedReceiver<HandleCommand>,
    stop_rx: &mut oneshot::Receiver<()>,
    on_event: &EventHandler,
) -> Option<TransportEvent> {
    let url = match endpoint::resolve(endpoint) {
        Ok(url) => url,
        Err(e) => {
            warn!(connection_id = %id, error = %e, "Endpoint rejected");
            return Some(TransportEvent::failure(e));
        }
    };

    debug!(connection_id = %id, url = %url, "Connecting");

    let connect = connect_async(url.as_str());
    tokio::pin!(connect);

    let ws_stream = loop {
        tokio::select! {
            result = &mut connect => match result {
                Ok((ws_stream, response)) => {
                    info!(
                        connection_id = %id,
                        status = response.status().as_u16(),
                        "WebSocket connection established"
                    );
                    break ws_stream;
                }
                Err(e) => {
                    let err = Error::from_ws(e);
                    warn!(connection_id = %id, error = %err, "Handshake failed");
                    return Some(TransportEvent::failure(err));
                }
            },

            command = command_rx.recv() => match command {
                Some(HandleCommand::Text(_)) => {
                    trace!(connection_id = %id, "Dropping frame queued before open");
                }
                Some(HandleCommand::Close { code, reason }) => {
                    debug!(connection_id = %id, "Close requested before open, handshake abandoned");
                    return Some(TransportEvent::Closed { code, reason });
                }
                None => {
                    debug!(connection_id = %id, "Handle dropped before open");
                    return None;
                }
            },

            _ = &mut *stop_rx => {
                debug!(connection_id = %id, "Shutdown before open, handshake abandoned");
                return Some(TransportEvent::closed(CLOSE_GOING_AWAY, SHUTDOWN_REASON));
            }
        }
    };

    on_event(TransportEvent::Open);

    serve(inner, id, ws_stream, command_rx, stop_rx, on_event).await
}

/// Serves an open socket until it closes.
async fn serve(
    inner: &TransportInner,
    id: ConnectionId,
    ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    command_rx: &mut mpsc::UnboundedReceiver<HandleCommand>,
    stop_rx: &mut oneshot::Receiver<()>,
    on_event: &EventHandler,
) -> Option<TransportEvent> {
    let (mut ws_write, mut ws_read) = ws_stream.split();

    let mut peer_close: Option<(u16, String)> = None;
    let mut local_close: Option<(u16, String)> = None;
    let mut commands_open = true;

    let close_timer = sleep(inner.close_timeout);
    tokio::pin!(close_timer);

    loop {
        tokio::select! {
            // Incoming frames
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        trace!(connection_id = %id, len = text.len(), "Frame received");
                        on_event(TransportEvent::Text(text.as_str().to_owned()));
                    }

                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame.map_or_else(
                            || (CLOSE_NO_STATUS, String::new()),
                            |f| (u16::from(f.code), f.reason.as_str().to_owned()),
                        );
                        debug!(connection_id = %id, code, reason = %reason, "Close frame received");
                        on_event(TransportEvent::closing(code, reason.clone()));
                        peer_close = Some((code, reason));
                    }

                    Some(Err(e)) => {
                        let err = Error::from_ws(e);
                        if matches!(err, Error::ConnectionClosed) {
                            break;
                        }
                        warn!(connection_id = %id, error = %err, "WebSocket error");
                        return Some(TransportEvent::failure(err));
                    }

                    None => {
                        debug!(connection_id = %id, "WebSocket stream ended");
                        break;
                    }

                    // Ignore Binary, Ping, Pong
                    Some(Ok(_)) => {}
                }
            }

            // Commands from the session
            command = command_rx.recv(), if commands_open => {
                match command {
                    Some(HandleCommand::Text(text)) => {
                        trace!(connection_id = %id, len = text.len(), "Frame sent");
                        if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                            if peer_close.is_some() || local_close.is_some() {
                                trace!(connection_id = %id, error = %e, "Frame dropped while closing");
                            } else {
                                let err = Error::from_ws(e);
                                warn!(connection_id = %id, error = %err, "Failed to send frame");
                                return Some(TransportEvent::failure(err));
                            }
                        }
                    }

                    Some(HandleCommand::Close { code, reason }) => {
                        let closing = peer_close.is_some() || local_close.is_some();
                        if start_close(&mut ws_write, id, code, &reason, closing).await {
                            close_timer.as_mut().reset(Instant::now() + inner.close_timeout);
                            local_close = Some((code, reason));
                        }
                    }

                    None => {
                        debug!(connection_id = %id, "Handle dropped");
                        commands_open = false;
                        let closing = peer_close.is_some() || local_close.is_some();
                        if start_close(&mut ws_write, id, CLOSE_NORMAL, "", closing).await {
                            close_timer.as_mut().reset(Instant::now() + inner.close_timeout);
                            local_close = Some((CLOSE_NORMAL, String::new()));
                        }
                    }
                }
            }

            // Transport shutdown
            _ = &mut *stop_rx => {
                debug!(connection_id = %id, "Shutdown signal received");
                send_going_away(&mut ws_write, id).await;
                return Some(TransportEvent::closed(CLOSE_GOING_AWAY, SHUTDOWN_REASON));
            }

            // Peer did not answer a local close in time
            () = &mut close_timer, if local_close.is_some() && peer_close.is_none() => {
                debug!(connection_id = %id, "Close handshake timed out");
                break;
            }
        }
    }

    match (peer_close, local_close) {
        (Some((code, reason)), _) | (None, Some((code, reason))) => {
            Some(TransportEvent::Closed { code, reason })
        }
        (None, None) => {
            warn!(connection_id = %id, "Connection lost without close handshake");
            Some(TransportEvent::failure(Error::ConnectionClosed))
        }
    }
}

/// Sends a close frame unless a close is already under way.
///
/// Returns `true` if the frame was sent.
async fn start_close(
    ws_write: &mut WsSink,
    id: ConnectionId,
    code: u16,
    reason: &str,
    closing: bool,
) -> bool {
    if closing {
        trace!(connection_id = %id, "Close already in progress");
        return false;
    }

    debug!(connection_id = %id, code, reason, "Sending close frame");
    match ws_write.send(Message::Close(Some(close_frame(code, reason)))).await {
        Ok(()) => true,
        Err(e) => {
            debug!(connection_id = %id, error = %e, "Failed to send close frame");
            false
        }
    }
}

/// Sends the going-away frame, bounded by [`SHUTDOWN_GRACE`].
async fn send_going_away(ws_write: &mut WsSink, id: ConnectionId) {
    let frame = close_frame(CLOSE_GOING_AWAY, SHUTDOWN_REASON);
    match timeout(SHUTDOWN_GRACE, ws_write.send(Message::Close(Some(frame)))).await {
        Ok(Ok(())) => trace!(connection_id = %id, "Going-away frame sent"),
        Ok(Err(e)) => trace!(connection_id = %id, error = %e, "Going-away frame not sent"),
        Err(_) => trace!(connection_id = %id, "Going-away frame timed out"),
    }
}

/// Builds a close frame.
fn close_frame(code: u16, reason: &str) -> CloseFrame {
    CloseFrame {
        code: CloseCode::from(code),
        reason: reason.to_string().into(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transport::server::TestServer;

    const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Collects events into a channel.
    fn collector() -> (EventHandler, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler: EventHandler = Arc::new(move |event| {
            let _ = tx.send(event);
        });
        (handler, rx)
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<TransportEvent>) -> TransportEvent {
        timeout(EVENT_TIMEOUT, rx.recv())
            .await
            .expect("event should arrive in time")
            .expect("event channel open")
    }

    #[test]
    fn test_new_outside_runtime() {
        let err = WsTransport::new().err().expect("no runtime here");
        assert!(matches!(err, Error::NoRuntime { .. }));
    }

    #[tokio::test]
    async fn test_echo_round_trip_and_close() {
        let server = TestServer::bind().await;
        let url = server.ws_url();
        server.spawn_echo();

        let transport = WsTransport::new().unwrap();
        let (handler, mut events) = collector();
        let handle = transport.open(ConnectionId::next(), &url, handler);

        assert_eq!(next_event(&mut events).await, TransportEvent::Open);

        assert!(handle.send_text("ping"));
        assert_eq!(
            next_event(&mut events).await,
            TransportEvent::Text("ping".into())
        );

        assert!(handle.close(CLOSE_NORMAL, "bye"));
        assert!(matches!(
            next_event(&mut events).await,
            TransportEvent::Closing { code: CLOSE_NORMAL, .. }
        ));
        assert!(matches!(
            next_event(&mut events).await,
            TransportEvent::Closed { code: CLOSE_NORMAL, .. }
        ));
    }

    #[tokio::test]
    async fn test_server_initiated_close() {
        let server = TestServer::bind().await;
        let url = server.ws_url();
        server.spawn_closing(4000, "done");

        let transport = WsTransport::new().unwrap();
        let (handler, mut events) = collector();
        let _handle = transport.open(ConnectionId::next(), &url, handler);

        assert_eq!(next_event(&mut events).await, TransportEvent::Open);
        assert_eq!(
            next_event(&mut events).await,
            TransportEvent::closing(4000, "done")
        );
        assert_eq!(
            next_event(&mut events).await,
            TransportEvent::closed(4000, "done")
        );
    }

    #[tokio::test]
    async fn test_handshake_rejected_carries_status() {
        let server = TestServer::bind().await;
        let url = server.ws_url();
        server.spawn_rejecting(403);

        let transport = WsTransport::new().unwrap();
        let (handler, mut events) = collector();
        let _handle = transport.open(ConnectionId::next(), &url, handler);

        match next_event(&mut events).await {
            TransportEvent::Failure(failure) => assert_eq!(failure.status, Some(403)),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_endpoint_fails_asynchronously() {
        let transport = WsTransport::new().unwrap();
        let (handler, mut events) = collector();
        let handle = transport.open(ConnectionId::next(), "::not a url::", handler);

        assert!(matches!(
            next_event(&mut events).await,
            TransportEvent::Failure(_)
        ));
        // Loop is gone, so the handle refuses work.
        assert!(!handle.send_text("late"));
    }

    #[tokio::test]
    async fn test_refused_connection_fails() {
        let server = TestServer::bind().await;
        let url = server.ws_url();
        drop(server);

        let transport = WsTransport::new().unwrap();
        let (handler, mut events) = collector();
        let _handle = transport.open(ConnectionId::next(), &url, handler);

        assert!(matches!(
            next_event(&mut events).await,
            TransportEvent::Failure(_)
        ));
    }

    #[tokio::test]
    async fn test_shutdown_closes_open_connections() {
        let server = TestServer::bind().await;
        let url = server.ws_url();
        server.spawn_echo();

        let transport = WsTransport::new().unwrap();
        let (handler, mut events) = collector();
        let _handle = transport.open(ConnectionId::next(), &url, handler);
        assert_eq!(next_event(&mut events).await, TransportEvent::Open);
        assert_eq!(transport.active_count(), 1);

        transport.shutdown();
        transport.shutdown();

        assert_eq!(
            next_event(&mut events).await,
            TransportEvent::closed(CLOSE_GOING_AWAY, SHUTDOWN_REASON)
        );
        assert_eq!(transport.active_count(), 0);
        assert!(transport.is_shut_down());
    }

    #[tokio::test]
    async fn test_dropping_handle_closes_connection() {
        let server = TestServer::bind().await;
        let url = server.ws_url();
        server.spawn_echo();

        let transport = WsTransport::new().unwrap();
        let (handler, mut events) = collector();
        let handle = transport.open(ConnectionId::next(), &url, handler);
        assert_eq!(next_event(&mut events).await, TransportEvent::Open);

        drop(handle);

        assert!(matches!(
            next_event(&mut events).await,
            TransportEvent::Closing { code: CLOSE_NORMAL, .. }
        ));
        assert!(matches!(
            next_event(&mut events).await,
            TransportEvent::Closed { code: CLOSE_NORMAL, .. }
        ));
        assert_eq!(transport.active_count(), 0);
        assert!(!transport.is_shut_down());
    }

    #[tokio::test]
    async fn test_open_after_shutdown_fails() {
        let transport = WsTransport::new().unwrap();
        transport.shutdown();

        let (handler, mut events) = collector();
        let _handle = transport.open(ConnectionId::next(), "ws://127.0.0.1:1", handler);

        match next_event(&mut events).await {
            TransportEvent::Failure(failure) => {
                assert_eq!(failure.message, Error::TransportShutdown.to_string());
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_with_close_timeout() {
        let transport = WsTransport::new()
            .unwrap()
            .with_close_timeout(Duration::from_millis(100));
        assert_eq!(transport.inner.close_timeout, Duration::from_millis(100));
    }
}
