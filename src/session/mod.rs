//! Session module.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ConnectionSession`] | Owns the socket, state and message log |
//! | [`SessionConfig`] | Endpoint, greeting and close settings |
//! | [`ConnectionState`] | Connected / Disconnected |

// ============================================================================
// Submodules
// ============================================================================

/// Session configuration.
pub mod config;

/// Connection session implementation.
pub mod core;

/// Connection state.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::SessionConfig;
pub use core::ConnectionSession;
pub use state::ConnectionState;
