//! Metrics hooks for envelope traffic
//!
//! The bus only talks to [`MetricsRecorder`]; `event-telemetry` provides a
//! Prometheus-backed implementation, [`Metrics`] is an in-process collector
//! and [`NoOpMetrics`] is the default.

use std::sync::atomic::{AtomicU64, Ordering};

/// Trait for custom metrics recording implementations
pub trait MetricsRecorder: Send + Sync {
    /// Envelope successfully encoded
    fn record_encoded(&self, payload_bytes: usize);

    /// Envelope successfully decoded into an event
    fn record_decoded(&self);

    /// Decode rejected; `kind` is [`crate::CodecError::kind`]
    fn record_decode_failure(&self, kind: &'static str);

    /// Message accepted by the transport
    fn record_published(&self);

    /// Encode or transport failure on publish
    fn record_publish_failure(&self);

    /// Application handler returned an error
    fn record_handler_failure(&self);

    /// Application handler panicked and was contained
    fn record_handler_panic(&self);
}

/// No-op metrics recorder for when metrics are disabled
#[derive(Debug, Default)]
pub struct NoOpMetrics;

impl MetricsRecorder for NoOpMetrics {
    fn record_encoded(&self, _: usize) {}
    fn record_decoded(&self) {}
    fn record_decode_failure(&self, _: &'static str) {}
    fn record_published(&self) {}
    fn record_publish_failure(&self) {}
    fn record_handler_failure(&self) {}
    fn record_handler_panic(&self) {}
}

/// Thread-safe counters
#[derive(Debug, Default)]
pub struct Metrics {
    pub encoded: AtomicU64,
    pub encoded_bytes: AtomicU64,
    pub decoded: AtomicU64,
    pub decode_failures: AtomicU64,
    pub published: AtomicU64,
    pub publish_failures: AtomicU64,
    pub handler_failures: AtomicU64,
    pub handler_panics: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            encoded: self.encoded.load(Ordering::Relaxed),
            encoded_bytes: self.encoded_bytes.load(Ordering::Relaxed),
            decoded: self.decoded.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            handler_panics: self.handler_panics.load(Ordering::Relaxed),
        }
    }
}

impl MetricsRecorder for Metrics {
    fn record_encoded(&self, payload_bytes: usize) {
        self.encoded.fetch_add(1, Ordering::Relaxed);
        self.encoded_bytes
            .fetch_add(payload_bytes as u64, Ordering::Relaxed);
    }

    fn record_decoded(&self) {
        self.decoded.fetch_add(1, Ordering::Relaxed);
    }

    fn record_decode_failure(&self, _kind: &'static str) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn record_handler_failure(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn record_handler_panic(&self) {
        self.handler_panics.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time metrics snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub encoded: u64,
    pub encoded_bytes: u64,
    pub decoded: u64,
    pub decode_failures: u64,
    pub published: u64,
    pub publish_failures: u64,
    pub handler_failures: u64,
    pub handler_panics: u64,
}
