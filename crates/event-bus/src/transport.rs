//! # Transport Ports
//!
//! The publish/subscribe system underneath this layer. It owns connections,
//! acknowledgement, redelivery and topic routing; this crate only needs
//! "publish bytes with headers" and "subscribe with a callback".

use crate::subscriber::DeliveryError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Identifier handed out by the transport on subscribe.
pub type SubscriptionId = String;

/// Callback the transport invokes for every delivered message.
///
/// The returned error is reported to the transport's own retry/dead-letter
/// policy.
pub type DeliveryCallback =
    Arc<dyn Fn(Delivery) -> BoxFuture<'static, Result<(), DeliveryError>> + Send + Sync>;

/// Transport failures, passed through unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport is closed")]
    Closed,

    #[error("unknown subscription: {0}")]
    UnknownSubscription(SubscriptionId),

    #[error("transport rejected the operation: {0}")]
    Rejected(String),
}

/// A message as the transport sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportMessage {
    pub id: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub content_type: String,
}

/// A message delivered on a subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    pub topic: String,
    pub subscription_id: SubscriptionId,
    pub message: TransportMessage,
}

/// Subscription options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Consumer group; each group receives a message once.
    pub group: String,
}

impl SubscribeOptions {
    pub fn group(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
        }
    }
}

/// Publishing side of the transport (driven port).
#[async_trait]
pub trait TransportPublisher: Send + Sync {
    async fn publish(&self, topic: &str, message: TransportMessage) -> Result<(), TransportError>;
}

/// Subscribing side of the transport (driven port).
#[async_trait]
pub trait TransportSubscriber: Send + Sync {
    async fn subscribe(
        &self,
        topic: &str,
        options: SubscribeOptions,
        callback: DeliveryCallback,
    ) -> Result<SubscriptionId, TransportError>;

    async fn unsubscribe(&self, subscription_id: &str) -> Result<(), TransportError>;

    async fn close(&self) -> Result<(), TransportError>;
}
