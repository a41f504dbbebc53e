//! Error types for the WebSocket session core.
//!
//! Intents on [`ConnectionSession`](crate::ConnectionSession) never return
//! errors: connection problems surface asynchronously as a
//! [`TransportFailure`] on the session's last-error observable. [`Error`] is
//! used by configuration, endpoint resolution and transport internals, and is
//! converted into a [`TransportFailure`] before it reaches observers.
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::NoRuntime`] |
//! | Endpoint | [`Error::InvalidEndpoint`], [`Error::UnsupportedScheme`], [`Error::TlsUnavailable`] |
//! | Connection | [`Error::Connection`], [`Error::HandshakeRejected`], [`Error::ConnectionClosed`], [`Error::TransportShutdown`] |
//! | External | [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::result::Result as StdResult;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when a [`SessionConfig`](crate::SessionConfig) fails validation
    /// or cannot be parsed.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// No tokio runtime available to drive the transport.
    #[error("No tokio runtime available: {message}")]
    NoRuntime {
        /// Why the runtime handle could not be obtained.
        message: String,
    },

    // ========================================================================
    // Endpoint Errors
    // ========================================================================
    /// Endpoint string is not a valid URL.
    #[error("Invalid endpoint '{endpoint}': {message}")]
    InvalidEndpoint {
        /// The endpoint as given.
        endpoint: String,
        /// Parser message.
        message: String,
    },

    /// Endpoint uses a scheme that cannot carry a WebSocket.
    #[error("Unsupported endpoint scheme: {scheme}")]
    UnsupportedScheme {
        /// The rejected scheme.
        scheme: String,
    },

    /// Secure endpoint in a build without the `tls` feature.
    #[error("TLS support not built in, cannot dial '{endpoint}'")]
    TlsUnavailable {
        /// The endpoint as given.
        endpoint: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Server answered the upgrade request with a non-101 status.
    #[error("Handshake rejected with HTTP status {status}")]
    HandshakeRejected {
        /// HTTP status code of the rejection.
        status: u16,
    },

    /// Connection ended without a close handshake.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Transport was shut down before or while the connection was open.
    #[error("Transport shut down")]
    TransportShutdown,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a missing-runtime error.
    #[inline]
    pub fn no_runtime(message: impl Into<String>) -> Self {
        Self::NoRuntime {
            message: message.into(),
        }
    }

    /// Creates an invalid endpoint error.
    #[inline]
    pub fn invalid_endpoint(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Creates an unsupported scheme error.
    #[inline]
    pub fn unsupported_scheme(scheme: impl Into<String>) -> Self {
        Self::UnsupportedScheme {
            scheme: scheme.into(),
        }
    }

    /// Creates a TLS-unavailable error.
    #[inline]
    pub fn tls_unavailable(endpoint: impl Into<String>) -> Self {
        Self::TlsUnavailable {
            endpoint: endpoint.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Maps a tungstenite error, lifting HTTP upgrade rejections into
    /// [`Error::HandshakeRejected`].
    pub fn from_ws(err: WsError) -> Self {
        match err {
            WsError::Http(response) => Self::HandshakeRejected {
                status: response.status().as_u16(),
            },
            WsError::ConnectionClosed | WsError::AlreadyClosed => Self::ConnectionClosed,
            other => Self::WebSocket(other),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::HandshakeRejected { .. }
                | Self::ConnectionClosed
                | Self::TransportShutdown
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this is a configuration or endpoint error.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::NoRuntime { .. }
                | Self::InvalidEndpoint { .. }
                | Self::UnsupportedScheme { .. }
                | Self::TlsUnavailable { .. }
        )
    }

    /// Returns the HTTP status attached to this error, if any.
    #[inline]
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::HandshakeRejected { status } => Some(*status),
            _ => None,
        }
    }
}

// ============================================================================
// TransportFailure
// ============================================================================

/// Terminal transport error as seen by observers.
///
/// Published on the last-error observable when a connection attempt or an
/// open connection fails. Cloneable so it can live in a `watch` channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportFailure {
    /// Human-readable description.
    pub message: String,
    /// HTTP status of the upgrade response, when the server answered one.
    pub status: Option<u16>,
}

impl TransportFailure {
    /// Creates a failure without a response status.
    #[inline]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }
}

impl From<&Error> for TransportFailure {
    fn from(err: &Error) -> Self {
        Self {
            message: err.to_string(),
            status: err.http_status(),
        }
    }
}

impl From<Error> for TransportFailure {
    fn from(err: Error) -> Self {
        Self::from(&err)
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        match self.status {
            Some(status) if !self.message.contains(&status.to_string()) => {
                write!(f, " (HTTP {status})")
            }
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
