//! In-memory transport for session tests.
//!
//! Records every open, frame and close, and lets tests inject events for the
//! most recently opened handle.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::identifiers::ConnectionId;
use crate::protocol::TransportEvent;

use super::{EventHandler, Transport, TransportHandle};

// ============================================================================
// Types
// ============================================================================

/// Something a handle was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Sent {
    Text(ConnectionId, String),
    Close(ConnectionId, u16, String),
}

/// One `open` call.
struct Opened {
    id: ConnectionId,
    endpoint: String,
    on_event: EventHandler,
}

#[derive(Default)]
struct MockState {
    opened: Vec<Opened>,
    sent: Vec<Sent>,
}

// ============================================================================
// MockTransport
// ============================================================================

#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    state: Arc<Mutex<MockState>>,
    shutdowns: Arc<AtomicUsize>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` as the most recent handle would.
    pub(crate) fn emit(&self, event: TransportEvent) {
        let handler = {
            let state = self.state.lock();
            Arc::clone(&state.opened.last().expect("nothing opened").on_event)
        };
        handler(event);
    }

    /// Delivers `event` as the handle opened `index`-th would.
    pub(crate) fn emit_for(&self, index: usize, event: TransportEvent) {
        let handler = Arc::clone(&self.state.lock().opened[index].on_event);
        handler(event);
    }

    pub(crate) fn open_count(&self) -> usize {
        self.state.lock().opened.len()
    }

    pub(crate) fn last_endpoint(&self) -> Option<String> {
        self.state.lock().opened.last().map(|o| o.endpoint.clone())
    }

    pub(crate) fn connection_id(&self, index: usize) -> ConnectionId {
        self.state.lock().opened[index].id
    }

    pub(crate) fn sent(&self) -> Vec<Sent> {
        self.state.lock().sent.clone()
    }

    /// Texts transmitted, across all handles.
    pub(crate) fn sent_texts(&self) -> Vec<String> {
        self.state
            .lock()
            .sent
            .iter()
            .filter_map(|s| match s {
                Sent::Text(_, text) => Some(text.clone()),
                Sent::Close(..) => None,
            })
            .collect()
    }

    pub(crate) fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    fn open(
        &self,
        id: ConnectionId,
        endpoint: &str,
        on_event: EventHandler,
    ) -> Box<dyn TransportHandle> {
        self.state.lock().opened.push(Opened {
            id,
            endpoint: endpoint.to_string(),
            on_event,
        });
        Box::new(MockHandle {
            id,
            state: Arc::clone(&self.state),
        })
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// MockHandle
// ============================================================================

struct MockHandle {
    id: ConnectionId,
    state: Arc<Mutex<MockState>>,
}

impl TransportHandle for MockHandle {
    fn send_text(&self, text: &str) -> bool {
        self.state
            .lock()
            .sent
            .push(Sent::Text(self.id, text.to_string()));
        true
    }

    fn close(&self, code: u16, reason: &str) -> bool {
        self.state
            .lock()
            .sent
            .push(Sent::Close(self.id, code, reason.to_string()));
        true
    }
}
