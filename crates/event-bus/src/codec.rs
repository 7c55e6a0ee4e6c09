//! # Envelope Codec
//!
//! Turns a typed event into canonical wire bytes and back.
//!
//! ## Encode
//!
//! validate event → validate metadata → serialize payload → wrap in
//! `Envelope` → serialize envelope. Nothing is returned on failure.
//!
//! ## Decode
//!
//! A strict pipeline with no retry and no partial result:
//!
//! 1. reject empty input
//! 2. parse the envelope
//! 3. require and validate envelope metadata
//! 4. require payload bytes
//! 5. resolve the factory for the identity triple
//! 6. construct an empty instance
//! 7. populate it from the payload
//! 8. validate the instance
//! 9. require its metadata to match the envelope on schema version, event
//!    id, source and type
//!
//! `event_time` is not cross-checked between envelope and payload.

use crate::config::BusConfig;
use crate::metrics::{MetricsRecorder, NoOpMetrics};
use crate::registry::{FactoryRegistry, RegistryError};
use event_types::{current_timestamp, Envelope, Event, EventError, Metadata, MetadataError};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Encode and decode failures.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("event ({event_id}) is invalid: {source}")]
    InvalidEvent {
        event_id: String,
        #[source]
        source: EventError,
    },

    #[error("event metadata is missing")]
    MissingMetadata,

    #[error("event ({event_id}) metadata is invalid: {source}")]
    InvalidMetadata {
        event_id: String,
        #[source]
        source: MetadataError,
    },

    #[error("event ({event_id}) payload serialization failed: {source}")]
    PayloadSerializationFailed {
        event_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("event ({event_id}) envelope serialization failed: {source}")]
    EnvelopeSerializationFailed {
        event_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("envelope data is empty")]
    EmptyPayload,

    #[error("envelope decode failed: {0}")]
    EnvelopeDecodeFailed(#[source] serde_json::Error),

    #[error("event ({event_id}) envelope payload is empty")]
    EmptyEventPayload { event_id: String },

    #[error("event ({event_id}) has unknown type: {source}")]
    UnknownEventType {
        event_id: String,
        #[source]
        source: RegistryError,
    },

    #[error("event ({event_id}) instantiation failed: {source}")]
    EventInstantiationFailed {
        event_id: String,
        #[source]
        source: EventError,
    },

    #[error("event ({event_id}) decode failed: {source}")]
    EventDecodeFailed {
        event_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("decoded event ({event_id}) is invalid: {source}")]
    InvalidDecodedEvent {
        event_id: String,
        #[source]
        source: EventError,
    },

    #[error("decoded event ({event_id}) has no metadata")]
    MissingDecodedMetadata { event_id: String },

    #[error("event ({event_id}) schema version mismatch: envelope {expected}, payload {actual}")]
    SchemaVersionMismatch {
        event_id: String,
        expected: String,
        actual: String,
    },

    #[error("event ({event_id}) id mismatch: payload carries {actual}")]
    EventIdMismatch { event_id: String, actual: String },

    #[error("event ({event_id}) source mismatch: envelope {expected}, payload {actual}")]
    EventSourceMismatch {
        event_id: String,
        expected: String,
        actual: String,
    },

    #[error("event ({event_id}) type mismatch: envelope {expected}, payload {actual}")]
    EventTypeMismatch {
        event_id: String,
        expected: String,
        actual: String,
    },
}

impl CodecError {
    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidEvent { .. } => "invalid_event",
            Self::MissingMetadata => "missing_metadata",
            Self::InvalidMetadata { .. } => "invalid_metadata",
            Self::PayloadSerializationFailed { .. } => "payload_serialization_failed",
            Self::EnvelopeSerializationFailed { .. } => "envelope_serialization_failed",
            Self::EmptyPayload => "empty_payload",
            Self::EnvelopeDecodeFailed(_) => "envelope_decode_failed",
            Self::EmptyEventPayload { .. } => "empty_event_payload",
            Self::UnknownEventType { .. } => "unknown_event_type",
            Self::EventInstantiationFailed { .. } => "event_instantiation_failed",
            Self::EventDecodeFailed { .. } => "event_decode_failed",
            Self::InvalidDecodedEvent { .. } => "invalid_decoded_event",
            Self::MissingDecodedMetadata { .. } => "missing_decoded_metadata",
            Self::SchemaVersionMismatch { .. } => "schema_version_mismatch",
            Self::EventIdMismatch { .. } => "event_id_mismatch",
            Self::EventSourceMismatch { .. } => "event_source_mismatch",
            Self::EventTypeMismatch { .. } => "event_type_mismatch",
        }
    }
}

/// Wire bytes plus what the transport needs to attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedEnvelope {
    /// Equals the event id.
    pub message_id: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// Envelope encoder/decoder bound to a factory registry.
pub struct EnvelopeCodec {
    registry: Arc<FactoryRegistry>,
    config: BusConfig,
    metrics: Arc<dyn MetricsRecorder>,
}

impl EnvelopeCodec {
    pub fn new(registry: Arc<FactoryRegistry>) -> Self {
        Self::with_config(registry, BusConfig::default())
    }

    pub fn with_config(registry: Arc<FactoryRegistry>, config: BusConfig) -> Self {
        Self {
            registry,
            config,
            metrics: Arc::new(NoOpMetrics),
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn registry(&self) -> &Arc<FactoryRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<dyn MetricsRecorder> {
        &self.metrics
    }

    /// Encode an event. Normalizes the event's metadata in place.
    pub fn encode(&self, event: &mut dyn Event) -> Result<EncodedEnvelope, CodecError> {
        if let Err(source) = event.validate() {
            return Err(CodecError::InvalidEvent {
                event_id: event.event_id().to_string(),
                source,
            });
        }

        let max_skew = self.config.max_future_skew_secs;
        let metadata = event.metadata_mut().ok_or(CodecError::MissingMetadata)?;
        if let Err(source) = metadata.validate_at(current_timestamp(), max_skew) {
            return Err(CodecError::InvalidMetadata {
                event_id: metadata.event_id.clone(),
                source,
            });
        }
        let metadata = metadata.clone();
        let event_id = metadata.event_id.clone();

        let payload = event
            .to_payload()
            .map_err(|source| CodecError::PayloadSerializationFailed {
                event_id: event_id.clone(),
                source,
            })?;
        let payload_len = payload.len();

        let headers = metadata.to_headers();
        let body = Envelope::new(metadata, payload)
            .to_bytes()
            .map_err(|source| CodecError::EnvelopeSerializationFailed {
                event_id: event_id.clone(),
                source,
            })?;

        self.metrics.record_encoded(payload_len);
        debug!(event_id = %event_id, bytes = body.len(), "Envelope encoded");

        Ok(EncodedEnvelope {
            message_id: event_id,
            headers,
            body,
        })
    }

    /// Decode wire bytes into a validated event.
    pub fn decode(&self, data: &[u8]) -> Result<Box<dyn Event>, CodecError> {
        match self.decode_inner(data) {
            Ok(event) => {
                self.metrics.record_decoded();
                debug!(event_id = %event.event_id(), "Envelope decoded");
                Ok(event)
            }
            Err(e) => {
                self.metrics.record_decode_failure(e.kind());
                warn!(kind = e.kind(), error = %e, "Envelope rejected");
                Err(e)
            }
        }
    }

    /// Validated envelope metadata, without resolving or decoding the payload.
    pub fn peek_metadata(&self, data: &[u8]) -> Result<Metadata, CodecError> {
        let (metadata, _) = self.open_envelope(data)?;
        Ok(metadata)
    }

    fn open_envelope(&self, data: &[u8]) -> Result<(Metadata, Vec<u8>), CodecError> {
        if data.is_empty() {
            return Err(CodecError::EmptyPayload);
        }

        let envelope = Envelope::from_bytes(data).map_err(CodecError::EnvelopeDecodeFailed)?;

        let mut metadata = envelope.metadata.ok_or(CodecError::MissingMetadata)?;
        if let Err(source) =
            metadata.validate_at(current_timestamp(), self.config.max_future_skew_secs)
        {
            return Err(CodecError::InvalidMetadata {
                event_id: metadata.event_id,
                source,
            });
        }

        Ok((metadata, envelope.payload))
    }

    fn decode_inner(&self, data: &[u8]) -> Result<Box<dyn Event>, CodecError> {
        let (metadata, payload) = self.open_envelope(data)?;
        let event_id = metadata.event_id.clone();

        if payload.is_empty() {
            return Err(CodecError::EmptyEventPayload { event_id });
        }

        let factory = self
            .registry
            .lookup(
                &metadata.schema_version,
                &metadata.event_source,
                &metadata.event_type,
            )
            .map_err(|source| CodecError::UnknownEventType {
                event_id: event_id.clone(),
                source,
            })?;

        let mut event = factory().map_err(|source| CodecError::EventInstantiationFailed {
            event_id: event_id.clone(),
            source,
        })?;

        event
            .populate(&payload)
            .map_err(|source| CodecError::EventDecodeFailed {
                event_id: event_id.clone(),
                source,
            })?;

        if let Err(source) = event.validate() {
            return Err(CodecError::InvalidDecodedEvent { event_id, source });
        }

        let mut decoded = match event.metadata() {
            Some(m) => m.clone(),
            None => return Err(CodecError::MissingDecodedMetadata { event_id }),
        };
        decoded.normalize();
        check_matches(&metadata, &decoded)?;

        Ok(event)
    }
}

impl Default for EnvelopeCodec {
    /// Codec bound to the process-wide registry.
    fn default() -> Self {
        Self::new(FactoryRegistry::global())
    }
}

/// Field-for-field match, `event_time` excluded.
fn check_matches(envelope: &Metadata, decoded: &Metadata) -> Result<(), CodecError> {
    let event_id = envelope.event_id.clone();

    if decoded.schema_version != envelope.schema_version {
        return Err(CodecError::SchemaVersionMismatch {
            event_id,
            expected: envelope.schema_version.to_string(),
            actual: decoded.schema_version.to_string(),
        });
    }
    if decoded.event_id != envelope.event_id {
        return Err(CodecError::EventIdMismatch {
            event_id,
            actual: decoded.event_id.clone(),
        });
    }
    if decoded.event_source != envelope.event_source {
        return Err(CodecError::EventSourceMismatch {
            event_id,
            expected: envelope.event_source.to_string(),
            actual: decoded.event_source.to_string(),
        });
    }
    if decoded.event_type != envelope.event_type {
        return Err(CodecError::EventTypeMismatch {
            event_id,
            expected: envelope.event_type.to_string(),
            actual: decoded.event_type.to_string(),
        });
    }

    Ok(())
}
