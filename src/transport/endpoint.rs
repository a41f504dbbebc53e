//! Endpoint resolution.
//!
//! HTTP-style URLs are accepted and mapped onto their WebSocket schemes:
//!
//! | Given | Dialed |
//! |-------|--------|
//! | `http://host/` | `ws://host/` |
//! | `https://host/` | `wss://host/` |
//! | `ws://` / `wss://` | unchanged |

// ============================================================================
// Imports
// ============================================================================

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Resolution
// ============================================================================

/// Parses `endpoint` and returns the WebSocket URL to dial.
///
/// # Errors
///
/// - [`Error::InvalidEndpoint`] if the string is not a URL or has no host
/// - [`Error::UnsupportedScheme`] for schemes other than http(s)/ws(s)
/// - [`Error::TlsUnavailable`] for secure schemes when built without `tls`
pub fn resolve(endpoint: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint.trim())
        .map_err(|e| Error::invalid_endpoint(endpoint, e.to_string()))?;

    let ws_scheme = match url.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => return Err(Error::unsupported_scheme(other)),
    };

    if url.host_str().is_none() {
        return Err(Error::invalid_endpoint(endpoint, "missing host"));
    }

    if ws_scheme == "wss" && !cfg!(feature = "tls") {
        return Err(Error::tls_unavailable(endpoint));
    }

    if url.scheme() != ws_scheme {
        url.set_scheme(ws_scheme)
            .map_err(|()| Error::invalid_endpoint(endpoint, "cannot rewrite scheme"))?;
    }

    Ok(url)
}

// ============================================================================
// Tests
// ============================================================================
