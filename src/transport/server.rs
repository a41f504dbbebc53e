//! Local WebSocket server for transport tests.
//!
//! Binds to `127.0.0.1:0` and serves exactly one connection with a fixed
//! behavior: echo, immediate close, or handshake rejection.

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::debug;

// ============================================================================
// TestServer
// ============================================================================

/// A bound, not yet accepting, WebSocket server.
pub(crate) struct TestServer {
    /// TCP listener for the single expected client.
    listener: TcpListener,
    /// Port the server is bound to.
    port: u16,
}

impl TestServer {
    /// Binds to a random localhost port.
    pub(crate) async fn bind() -> Self {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
        let listener = TcpListener::bind(addr).await.expect("bind should succeed");
        let port = listener.local_addr().expect("local addr").port();

        debug!(port, "Test server bound");

        Self { listener, port }
    }

    /// Returns the WebSocket URL for this server.
    pub(crate) fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    /// Echoes every text frame until the client closes.
    pub(crate) fn spawn_echo(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let (stream, _) = self.listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream)
                .await
                .expect("upgrade");

            while let Some(Ok(message)) = ws.next().await {
                if message.is_text() && ws.send(message).await.is_err() {
                    break;
                }
            }
        })
    }

    /// Closes with `code`/`reason` right after the handshake.
    pub(crate) fn spawn_closing(self, code: u16, reason: &'static str) -> JoinHandle<()> {
        tokio::spawn(async move {
            let (stream, _) = self.listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream)
                .await
                .expect("upgrade");

            let frame = CloseFrame {
                code: CloseCode::from(code),
                reason: reason.into(),
            };
            let _ = ws.close(Some(frame)).await;

            // Drain until the client's reply completes the handshake.
            while let Some(Ok(_)) = ws.next().await {}
        })
    }

    /// Answers the upgrade request with `status`.
    pub(crate) fn spawn_rejecting(self, status: u16) -> JoinHandle<()> {
        tokio::spawn(async move {
            let (stream, _) = self.listener.accept().await.expect("accept");
            let reject = move |_request: &Request, _response: Response| -> Result<Response, ErrorResponse> {
                let mut response = ErrorResponse::new(Some("rejected".to_string()));
                *response.status_mut() = StatusCode::from_u16(status).expect("valid status");
                Err(response)
            };
            let _ = tokio_tungstenite::accept_hdr_async(stream, reject).await;
        })
    }
}
