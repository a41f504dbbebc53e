//! Message log entries.
//!
//! A [`Message`] is one text frame that was sent or received. Entries are
//! immutable once created and kept in a [`MessageLog`] in arrival order.
//!
//! # Wire shape for UI consumers
//!
//! ```json
//! { "outbound": true, "text": "hello" }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::ops::Index;
use std::slice;

use serde::{Deserialize, Serialize};

// ============================================================================
// Direction
// ============================================================================

/// Which way a frame travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Sent by this client.
    Outbound,
    /// Received from the server.
    Inbound,
}

impl Direction {
    /// Returns `true` for [`Direction::Outbound`].
    #[inline]
    #[must_use]
    pub const fn is_outbound(self) -> bool {
        matches!(self, Self::Outbound)
    }
}

// ============================================================================
// Message
// ============================================================================

/// One logged text frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "MessageRepr", into = "MessageRepr")]
pub struct Message {
    direction: Direction,
    text: String,
}

impl Message {
    /// Creates an outbound entry.
    #[inline]
    pub fn outbound(text: impl Into<String>) -> Self {
        Self {
            direction: Direction::Outbound,
            text: text.into(),
        }
    }

    /// Creates an inbound entry.
    #[inline]
    pub fn inbound(text: impl Into<String>) -> Self {
        Self {
            direction: Direction::Inbound,
            text: text.into(),
        }
    }

    /// Returns the direction of the frame.
    #[inline]
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns `true` if this client sent the frame.
    #[inline]
    #[must_use]
    pub const fn is_outbound(&self) -> bool {
        self.direction.is_outbound()
    }

    /// Returns the frame text.
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Serialized form: `{ "outbound": bool, "text": string }`.
#[derive(Serialize, Deserialize)]
struct MessageRepr {
    outbound: bool,
    text: String,
}

impl From<MessageRepr> for Message {
    fn from(repr: MessageRepr) -> Self {
        let direction = if repr.outbound {
            Direction::Outbound
        } else {
            Direction::Inbound
        };
        Self {
            direction,
            text: repr.text,
        }
    }
}

impl From<Message> for MessageRepr {
    fn from(message: Message) -> Self {
        Self {
            outbound: message.is_outbound(),
            text: message.text,
        }
    }
}

// ============================================================================
// MessageLog
// ============================================================================

/// Append-only, chronologically ordered message history.
///
/// Only the owning session can append; observers get read access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageLog {
    entries: Vec<Message>,
}

impl MessageLog {
    /// Creates an empty log.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.entries.push(message);
    }

    /// Number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was sent or received yet.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry at `index`.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Message> {
        self.entries.get(index)
    }

    /// Returns the most recent entry.
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.entries.last()
    }

    /// Iterates entries oldest first.
    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, Message> {
        self.entries.iter()
    }

    /// Returns all entries as a slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Message] {
        &self.entries
    }
}

impl Index<usize> for MessageLog {
    type Output = Message;

    fn index(&self, index: usize) -> &Self::Output {
        &self.entries[index]
    }
}

impl<'a> IntoIterator for &'a MessageLog {
    type Item = &'a Message;
    type IntoIter = slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// ============================================================================
// Tests
// ============================================================================
