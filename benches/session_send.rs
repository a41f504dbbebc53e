//! Session send-path benchmarks.
//!
//! Measures the cost of the locked check-and-act in `send` plus the log
//! append, against a transport that discards frames:
//! - Sends on a connected session at different log sizes
//! - Dropped sends on a disconnected session
//!
//! Run with: cargo bench --bench session_send
//! Results saved to: target/criterion/

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use parking_lot::Mutex;
use ws_session::{
    ConnectionId, ConnectionSession, EventHandler, SessionConfig, Transport, TransportEvent,
    TransportHandle,
};

// ============================================================================
// Null Transport
// ============================================================================

/// Accepts every frame and does nothing with it.
#[derive(Default)]
struct NullTransport {
    handler: Mutex<Option<EventHandler>>,
}

struct NullHandle;

impl TransportHandle for NullHandle {
    fn send_text(&self, _text: &str) -> bool {
        true
    }

    fn close(&self, _code: u16, _reason: &str) -> bool {
        true
    }
}

impl Transport for NullTransport {
    fn open(&self, _id: ConnectionId, _endpoint: &str, on_event: EventHandler) -> Box<dyn TransportHandle> {
        *self.handler.lock() = Some(on_event);
        Box::new(NullHandle)
    }

    fn shutdown(&self) {}
}

fn connected_session() -> ConnectionSession {
    let transport = Arc::new(NullTransport::default());
    let session = ConnectionSession::with_transport(
        SessionConfig::new().without_hello_message(),
        Arc::clone(&transport) as Arc<dyn Transport>,
    );
    session.connect("ws://bench.local/");

    let handler = transport.handler.lock().clone().expect("opened");
    handler(TransportEvent::Open);
    session
}

// ============================================================================
// Benchmark Parameters
// ============================================================================

const PREFILLED_ENTRIES: &[usize] = &[0, 1_000, 100_000];

// ============================================================================
// Benchmark: Connected Send
// ============================================================================

fn bench_connected_send(c: &mut Criterion) {
    let mut group = c.benchmark_group("send_connected");

    for &prefill in PREFILLED_ENTRIES {
        group.bench_with_input(BenchmarkId::new("prefill", prefill), &prefill, |b, &prefill| {
            let session = connected_session();
            for i in 0..prefill {
                session.send(format!("seed-{i}"));
            }
            b.iter(|| session.send("payload"));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Dropped Send
// ============================================================================

fn bench_dropped_send(c: &mut Criterion) {
    let session = ConnectionSession::with_transport(
        SessionConfig::new(),
        Arc::new(NullTransport::default()),
    );

    c.bench_function("send_disconnected", |b| b.iter(|| session.send("payload")));
}

criterion_group!(benches, bench_connected_send, bench_dropped_send);
criterion_main!(benches);
