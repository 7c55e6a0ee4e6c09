//! Prometheus metrics for envelope traffic.
//!
//! All metrics follow the naming convention: `event_bus_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;
use event_bus::MetricsRecorder;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // CODEC METRICS
    // =========================================================================

    pub static ref EVENTS_ENCODED: Counter = Counter::new(
        "event_bus_events_encoded_total",
        "Total number of events encoded into envelopes"
    ).expect("metric creation failed");

    /// Serialized payload size, before base64 wrapping
    pub static ref ENCODED_PAYLOAD_BYTES: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "event_bus_encoded_payload_bytes",
            "Size of encoded event payloads"
        ).buckets(exponential_buckets(64.0, 2.0, 14).expect("bucket creation failed"))
    ).expect("metric creation failed");

    pub static ref EVENTS_DECODED: Counter = Counter::new(
        "event_bus_events_decoded_total",
        "Total number of envelopes decoded into events"
    ).expect("metric creation failed");

    /// Decode rejections by failure kind
    pub static ref DECODE_FAILURES: CounterVec = CounterVec::new(
        Opts::new("event_bus_decode_failures_total", "Envelopes rejected on decode"),
        &["kind"]
    ).expect("metric creation failed");

    // =========================================================================
    // ADAPTER METRICS
    // =========================================================================

    pub static ref EVENTS_PUBLISHED: Counter = Counter::new(
        "event_bus_events_published_total",
        "Total number of events accepted by the transport"
    ).expect("metric creation failed");

    pub static ref PUBLISH_FAILURES: Counter = Counter::new(
        "event_bus_publish_failures_total",
        "Total number of publish attempts that failed"
    ).expect("metric creation failed");

    pub static ref HANDLER_FAILURES: Counter = Counter::new(
        "event_bus_handler_failures_total",
        "Total number of handler invocations that returned an error"
    ).expect("metric creation failed");

    /// Contained handler panics (for alerting)
    pub static ref HANDLER_PANICS: Counter = Counter::new(
        "event_bus_handler_panics_total",
        "Total number of handler panics caught at the delivery boundary"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry. Safe to call repeatedly.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(EVENTS_ENCODED.clone()),
        Box::new(ENCODED_PAYLOAD_BYTES.clone()),
        Box::new(EVENTS_DECODED.clone()),
        Box::new(DECODE_FAILURES.clone()),
        Box::new(EVENTS_PUBLISHED.clone()),
        Box::new(PUBLISH_FAILURES.clone()),
        Box::new(HANDLER_FAILURES.clone()),
        Box::new(HANDLER_PANICS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// [`MetricsRecorder`] backed by the global Prometheus registry.
///
/// Only obtainable through [`PrometheusMetrics::register`].
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub struct PrometheusMetrics;

impl PrometheusMetrics {
    /// Register the collectors and return a recorder.
    pub fn register() -> Result<Self, TelemetryError> {
        register_metrics()?;
        Ok(Self)
    }
}

impl MetricsRecorder for PrometheusMetrics {
    fn record_encoded(&self, payload_bytes: usize) {
        EVENTS_ENCODED.inc();
        ENCODED_PAYLOAD_BYTES.observe(payload_bytes as f64);
    }

    fn record_decoded(&self) {
        EVENTS_DECODED.inc();
    }

    fn record_decode_failure(&self, kind: &'static str) {
        DECODE_FAILURES.with_label_values(&[kind]).inc();
    }

    fn record_published(&self) {
        EVENTS_PUBLISHED.inc();
    }

    fn record_publish_failure(&self) {
        PUBLISH_FAILURES.inc();
    }

    fn record_handler_failure(&self) {
        HANDLER_FAILURES.inc();
    }

    fn record_handler_panic(&self) {
        HANDLER_PANICS.inc();
    }
}
