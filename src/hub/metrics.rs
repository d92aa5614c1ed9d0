use serde::Serialize;
/// Connection metrics collection
///
/// Lock-free counters updated by the connection as frames flow; `snapshot()`
/// gives a serializable copy for status displays.
use std::sync::atomic::{ AtomicU64, Ordering };
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct ConnectionMetrics {
    frames_sent: AtomicU64,
    frames_received: AtomicU64,
    decode_errors: AtomicU64,
    acks_ok: AtomicU64,
    acks_err: AtomicU64,
    acks_timed_out: AtomicU64,
    acks_cancelled: AtomicU64,
    transport_losses: AtomicU64,
    identifies: AtomicU64,
}

impl ConnectionMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ack(&self, ok: bool) {
        if ok {
            self.acks_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.acks_err.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn inc_timed_out(&self) {
        self.acks_timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cancelled(&self, count: u64) {
        self.acks_cancelled.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_transport_loss(&self) {
        self.transport_losses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_identified(&self) {
        self.identifies.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ConnectionMetricsSnapshot {
        ConnectionMetricsSnapshot {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            acks_ok: self.acks_ok.load(Ordering::Relaxed),
            acks_err: self.acks_err.load(Ordering::Relaxed),
            acks_timed_out: self.acks_timed_out.load(Ordering::Relaxed),
            acks_cancelled: self.acks_cancelled.load(Ordering::Relaxed),
            transport_losses: self.transport_losses.load(Ordering::Relaxed),
            identifies: self.identifies.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot (serializable)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionMetricsSnapshot {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub decode_errors: u64,
    pub acks_ok: u64,
    pub acks_err: u64,
    pub acks_timed_out: u64,
    pub acks_cancelled: u64,
    pub transport_losses: u64,
    pub identifies: u64,
}
