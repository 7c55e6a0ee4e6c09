//! # Event Publisher
//!
//! validate → encode → attach headers → hand to the transport.

use crate::codec::{CodecError, EnvelopeCodec};
use crate::transport::{TransportError, TransportMessage, TransportPublisher};
use event_types::Event;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from publishing.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("topic must not be empty")]
    EmptyTopic,

    #[error("encode failed: {0}")]
    Encode(#[from] CodecError),

    #[error("event ({event_id}) publish failed: {source}")]
    Transport {
        event_id: String,
        #[source]
        source: TransportError,
    },
}

/// Publishes typed events as envelopes over a transport.
pub struct EventPublisher<P> {
    inner: Arc<P>,
    codec: Arc<EnvelopeCodec>,
}

impl<P: TransportPublisher> EventPublisher<P> {
    pub fn new(transport: Arc<P>, codec: Arc<EnvelopeCodec>) -> Self {
        Self {
            inner: transport,
            codec,
        }
    }

    pub fn codec(&self) -> &Arc<EnvelopeCodec> {
        &self.codec
    }

    /// Publish an event. The event's metadata is normalized in place.
    pub async fn publish(&self, topic: &str, event: &mut dyn Event) -> Result<(), PublishError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(PublishError::EmptyTopic);
        }

        let encoded = match self.codec.encode(event) {
            Ok(encoded) => encoded,
            Err(e) => {
                self.codec.metrics().record_publish_failure();
                warn!(topic = topic, kind = e.kind(), error = %e, "Event not published");
                return Err(e.into());
            }
        };

        let event_id = encoded.message_id.clone();
        let message = TransportMessage {
            id: encoded.message_id,
            headers: encoded.headers,
            body: encoded.body,
            content_type: self.codec.config().content_type.clone(),
        };

        if let Err(source) = self.inner.publish(topic, message).await {
            self.codec.metrics().record_publish_failure();
            warn!(topic = topic, event_id = %event_id, error = %source, "Transport rejected event");
            return Err(PublishError::Transport { event_id, source });
        }

        self.codec.metrics().record_published();
        debug!(topic = topic, event_id = %event_id, "Event published");
        Ok(())
    }

    /// No-op. This layer never owns transport resources; close the
    /// transport itself instead.
    #[deprecated(note = "no-op; close the underlying transport instead")]
    pub fn close(&self) -> Result<(), PublishError> {
        Ok(())
    }
}
