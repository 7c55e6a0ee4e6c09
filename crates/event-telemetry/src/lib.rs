//! # Event Telemetry
//!
//! Logging and metrics wiring for services built on `event-bus`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use event_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let metrics = init_telemetry(&TelemetryConfig::from_env())?;
//! let codec = EnvelopeCodec::new(registry).with_metrics(metrics);
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `EVENT_SERVICE_NAME` | `event-bus` | Service name attached to logs |
//! | `EVENT_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `EVENT_JSON_LOGS` | `false` (`true` in containers) | JSON formatted logs |
//! | `EVENT_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, PrometheusMetrics, DECODE_FAILURES, ENCODED_PAYLOAD_BYTES,
    EVENTS_DECODED, EVENTS_ENCODED, EVENTS_PUBLISHED, HANDLER_FAILURES, HANDLER_PANICS,
    PUBLISH_FAILURES, REGISTRY,
};

use std::sync::Arc;
use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Install logging and register metrics.
///
/// Returns the recorder to hand to `EnvelopeCodec::with_metrics`.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<Arc<PrometheusMetrics>, TelemetryError> {
    let metrics = PrometheusMetrics::register()?;
    init_logging(config)?;

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Telemetry initialized"
    );

    Ok(Arc::new(metrics))
}
