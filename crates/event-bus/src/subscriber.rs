//! # Event Subscriber
//!
//! Registers a wrapping callback with the transport. For every delivery the
//! wrapper:
//!
//! 1. runs everything below inside the fault guard
//! 2. rejects empty topics, empty bodies and foreign content types
//! 3. decodes the envelope
//! 4. invokes the application handler, tagging failures with the event id

use crate::codec::{CodecError, EnvelopeCodec};
use crate::guard::{self, HandlerFault};
use crate::transport::{
    Delivery, DeliveryCallback, SubscribeOptions, SubscriptionId, TransportError,
    TransportSubscriber,
};
use async_trait::async_trait;
use event_types::Event;
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Errors from subscription management.
#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("topic must not be empty")]
    EmptyTopic,

    #[error("group must not be empty")]
    EmptyGroup,

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Errors returned to the transport for a single delivery.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery has an empty topic")]
    EmptyTopic,

    #[error("delivery has an empty body")]
    EmptyBody,

    #[error("unsupported content type: {content_type:?}")]
    UnsupportedContentType { content_type: String },

    #[error(transparent)]
    Decode(#[from] CodecError),

    #[error("event ({event_id}) handler failed: {source}")]
    Handler {
        event_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{}\n{}", .0, .0.backtrace)]
    HandlerPanicked(#[from] HandlerFault),
}

/// Per-delivery information passed to handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryContext {
    pub subscription_id: SubscriptionId,
    pub group: String,
    pub message_id: String,
    pub headers: HashMap<String, String>,
}

/// Application callback for decoded events.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle(
        &self,
        ctx: DeliveryContext,
        topic: &str,
        event: Box<dyn Event>,
    ) -> anyhow::Result<()>;
}

/// Adapter turning an async closure into an [`EventHandler`].
pub struct HandlerFn<F>(F);

/// Wrap a closure `(ctx, topic, event) -> impl Future<Output = anyhow::Result<()>>`.
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(DeliveryContext, String, Box<dyn Event>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    HandlerFn(f)
}

#[async_trait]
impl<F, Fut> EventHandler for HandlerFn<F>
where
    F: Fn(DeliveryContext, String, Box<dyn Event>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(
        &self,
        ctx: DeliveryContext,
        topic: &str,
        event: Box<dyn Event>,
    ) -> anyhow::Result<()> {
        (self.0)(ctx, topic.to_string(), event).await
    }
}

/// Subscribes typed handlers to envelope traffic on a transport.
pub struct EventSubscriber<S> {
    inner: Arc<S>,
    codec: Arc<EnvelopeCodec>,
}

impl<S: TransportSubscriber> EventSubscriber<S> {
    pub fn new(transport: Arc<S>, codec: Arc<EnvelopeCodec>) -> Self {
        Self {
            inner: transport,
            codec,
        }
    }

    pub fn codec(&self) -> &Arc<EnvelopeCodec> {
        &self.codec
    }

    /// Subscribe `handler` to `topic` within consumer `group`.
    pub async fn subscribe<H: EventHandler>(
        &self,
        topic: &str,
        group: &str,
        handler: H,
    ) -> Result<SubscriptionId, SubscribeError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(SubscribeError::EmptyTopic);
        }
        let group = group.trim();
        if group.is_empty() {
            return Err(SubscribeError::EmptyGroup);
        }

        let callback = wrap_handler(self.codec.clone(), Arc::new(handler), group.to_string());
        let id = self
            .inner
            .subscribe(topic, SubscribeOptions::group(group), callback)
            .await?;

        debug!(topic = topic, group = group, subscription_id = %id, "Subscribed");
        Ok(id)
    }

    pub async fn unsubscribe(&self, subscription_id: &str) -> Result<(), SubscribeError> {
        self.inner.unsubscribe(subscription_id).await?;
        Ok(())
    }

    pub async fn close(&self) -> Result<(), SubscribeError> {
        self.inner.close().await?;
        Ok(())
    }
}

/// Build the transport callback around an application handler.
pub fn wrap_handler(
    codec: Arc<EnvelopeCodec>,
    handler: Arc<dyn EventHandler>,
    group: String,
) -> DeliveryCallback {
    Arc::new(move |delivery: Delivery| {
        let codec = codec.clone();
        let handler = handler.clone();
        let group = group.clone();

        async move {
            let subscription_id = delivery.subscription_id.clone();
            let outcome = guard::contain(deliver(&codec, handler.as_ref(), &group, delivery)).await;

            match outcome {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => {
                    warn!(subscription_id = %subscription_id, error = %e, "Delivery failed");
                    Err(e)
                }
                Err(fault) => {
                    codec.metrics().record_handler_panic();
                    error!(
                        subscription_id = %subscription_id,
                        panic = %fault.message,
                        location = fault.location.as_deref().unwrap_or("unknown"),
                        "Event handler panicked"
                    );
                    Err(DeliveryError::HandlerPanicked(fault))
                }
            }
        }
        .boxed()
    })
}

async fn deliver(
    codec: &EnvelopeCodec,
    handler: &dyn EventHandler,
    group: &str,
    delivery: Delivery,
) -> Result<(), DeliveryError> {
    let topic = delivery.topic.trim();
    if topic.is_empty() {
        return Err(DeliveryError::EmptyTopic);
    }

    let message = delivery.message;
    if message.body.is_empty() {
        return Err(DeliveryError::EmptyBody);
    }

    if !codec.config().accepts_content_type(&message.content_type) {
        return Err(DeliveryError::UnsupportedContentType {
            content_type: message.content_type.trim().to_lowercase(),
        });
    }

    let event = codec.decode(&message.body)?;
    let event_id = event.event_id().to_string();

    let ctx = DeliveryContext {
        subscription_id: delivery.subscription_id,
        group: group.to_string(),
        message_id: message.id,
        headers: message.headers,
    };

    if let Err(source) = handler.handle(ctx, topic, event).await {
        codec.metrics().record_handler_failure();
        return Err(DeliveryError::Handler { event_id, source });
    }

    Ok(())
}
