//! Session configuration.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use ws_session::SessionConfig;
//!
//! let config = SessionConfig::new()
//!     .with_endpoint("ws://127.0.0.1:9001")
//!     .with_hello_message("client up")
//!     .with_close_reason("client down")
//!     .with_close_timeout(Duration::from_secs(2));
//!
//! assert!(config.validate().is_ok());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::protocol::MAX_CLOSE_REASON_BYTES;

// ============================================================================
// Defaults
// ============================================================================

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://echo.websocket.org/";

/// Greeting sent right after the connection opens.
pub const DEFAULT_HELLO_MESSAGE: &str = "Android Client Connected";

/// Reason attached to locally initiated closes.
pub const DEFAULT_CLOSE_REASON: &str = "Android Client Disconnected";

/// How long a local close waits for the peer's close frame.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// SessionConfig
// ============================================================================

/// Settings for a [`ConnectionSession`](crate::ConnectionSession).
///
/// Deserializable from JSON; missing fields take their defaults and
/// `close_timeout_ms` is given in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SessionConfig {
    /// Endpoint URL. `http`/`https` are mapped to `ws`/`wss`.
    pub endpoint: String,

    /// Text sent and logged when the connection opens. `None` disables it.
    pub hello_message: Option<String>,

    /// Reason sent with the normal-closure code on `disconnect()`.
    pub close_reason: String,

    /// Grace period for the peer's close frame.
    #[serde(rename = "close_timeout_ms", with = "duration_ms")]
    pub close_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            hello_message: Some(DEFAULT_HELLO_MESSAGE.to_string()),
            close_reason: DEFAULT_CLOSE_REASON.to_string(),
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl SessionConfig {
    /// Creates a config with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a config from JSON and validates it.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the document is malformed
    /// - [`Error::Config`] if validation fails
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl SessionConfig {
    /// Sets the endpoint URL.
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the greeting sent on open.
    #[inline]
    #[must_use]
    pub fn with_hello_message(mut self, hello: impl Into<String>) -> Self {
        self.hello_message = Some(hello.into());
        self
    }

    /// Disables the greeting.
    #[inline]
    #[must_use]
    pub fn without_hello_message(mut self) -> Self {
        self.hello_message = None;
        self
    }

    /// Sets the close reason.
    #[inline]
    #[must_use]
    pub fn with_close_reason(mut self, reason: impl Into<String>) -> Self {
        self.close_reason = reason.into();
        self
    }

    /// Sets the close grace period.
    #[inline]
    #[must_use]
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl SessionConfig {
    /// Validates the configuration.
    ///
    /// The endpoint is only checked for emptiness here; a malformed URL is
    /// reported through the session's failure path when connecting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if validation fails.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::config("Endpoint must not be empty"));
        }

        if self.close_reason.len() > MAX_CLOSE_REASON_BYTES {
            return Err(Error::config(format!(
                "Close reason is {} bytes, limit is {MAX_CLOSE_REASON_BYTES}",
                self.close_reason.len()
            )));
        }

        if self.close_timeout.is_zero() {
            return Err(Error::config("Close timeout must be greater than zero"));
        }

        Ok(())
    }
}

// ============================================================================
// Serde Helpers
// ============================================================================

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

// ============================================================================
// Tests
// ============================================================================
