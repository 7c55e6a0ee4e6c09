//! # Test Fixtures
//!
//! Sample order events, a registry that knows them, and a fully wired bus
//! running on the in-memory broker.

use async_trait::async_trait;
use event_bus::{
    BusConfig, CodecError, DeliveryContext, EnvelopeCodec, EventHandler, EventPublisher,
    EventSubscriber, FactoryRegistry, InMemoryBroker, Metrics, TransportMessage,
};
use event_types::{Event, EventError, Metadata};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const SCHEMA_V1: &str = "v1";
pub const ORDERS_SOURCE: &str = "orders";
pub const ORDER_PLACED: &str = "order.placed";
pub const ORDER_CANCELLED: &str = "order.cancelled";
pub const ORDERS_TOPIC: &str = "orders.events";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlaced {
    pub metadata: Metadata,
    pub order_id: String,
    pub amount_cents: u64,
}

impl OrderPlaced {
    pub fn new(order_id: &str, amount_cents: u64) -> Self {
        Self {
            metadata: Metadata::new(SCHEMA_V1, ORDERS_SOURCE, ORDER_PLACED),
            order_id: order_id.to_string(),
            amount_cents,
        }
    }
}

impl Event for OrderPlaced {
    fn metadata(&self) -> Option<&Metadata> {
        Some(&self.metadata)
    }

    fn metadata_mut(&mut self) -> Option<&mut Metadata> {
        Some(&mut self.metadata)
    }

    fn validate(&mut self) -> Result<(), EventError> {
        self.metadata.validate()?;
        if self.order_id.trim().is_empty() {
            return Err(EventError::invalid("order id is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCancelled {
    pub metadata: Metadata,
    pub order_id: String,
    pub reason: String,
}

impl OrderCancelled {
    pub fn new(order_id: &str, reason: &str) -> Self {
        Self {
            metadata: Metadata::new(SCHEMA_V1, ORDERS_SOURCE, ORDER_CANCELLED),
            order_id: order_id.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl Event for OrderCancelled {
    fn metadata(&self) -> Option<&Metadata> {
        Some(&self.metadata)
    }

    fn metadata_mut(&mut self) -> Option<&mut Metadata> {
        Some(&mut self.metadata)
    }
}

/// Registry with both order events registered.
pub fn order_registry() -> Arc<FactoryRegistry> {
    let registry = FactoryRegistry::new();
    registry.must_register(SCHEMA_V1, ORDERS_SOURCE, ORDER_PLACED, || {
        Ok(Box::new(OrderPlaced::default()) as Box<dyn Event>)
    });
    registry.must_register(SCHEMA_V1, ORDERS_SOURCE, ORDER_CANCELLED, || {
        Ok(Box::new(OrderCancelled::default()) as Box<dyn Event>)
    });
    Arc::new(registry)
}

/// Publisher and subscriber sharing one broker and one codec.
pub struct TestBus {
    pub broker: Arc<InMemoryBroker>,
    pub codec: Arc<EnvelopeCodec>,
    pub metrics: Arc<Metrics>,
    pub publisher: EventPublisher<InMemoryBroker>,
    pub subscriber: EventSubscriber<InMemoryBroker>,
}

impl TestBus {
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    pub fn with_config(config: BusConfig) -> Self {
        let broker = Arc::new(InMemoryBroker::new());
        let metrics = Arc::new(Metrics::new());
        let codec = Arc::new(
            EnvelopeCodec::with_config(order_registry(), config).with_metrics(metrics.clone()),
        );

        Self {
            publisher: EventPublisher::new(broker.clone(), codec.clone()),
            subscriber: EventSubscriber::new(broker.clone(), codec.clone()),
            broker,
            codec,
            metrics,
        }
    }

    /// Encode `event` into the message the publisher would hand over.
    pub fn message_for(&self, event: &mut dyn Event) -> Result<TransportMessage, CodecError> {
        let encoded = self.codec.encode(event)?;
        Ok(TransportMessage {
            id: encoded.message_id,
            headers: encoded.headers,
            body: encoded.body,
            content_type: self.codec.config().content_type.clone(),
        })
    }
}

impl Default for TestBus {
    fn default() -> Self {
        Self::new()
    }
}

/// One delivery as seen by a handler.
#[derive(Debug)]
pub struct Received {
    pub ctx: DeliveryContext,
    pub topic: String,
    pub event: Box<dyn Event>,
}

/// Handler that records every delivery.
#[derive(Clone, Default)]
pub struct Collector {
    received: Arc<Mutex<Vec<Received>>>,
}

impl Collector {
    pub fn len(&self) -> usize {
        self.received.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.received.lock().is_empty()
    }

    pub fn take(&self) -> Vec<Received> {
        std::mem::take(&mut *self.received.lock())
    }

    /// Order ids of received `OrderPlaced` events, in arrival order.
    pub fn placed_order_ids(&self) -> Vec<String> {
        self.received
            .lock()
            .iter()
            .filter_map(|r| r.event.downcast_ref::<OrderPlaced>())
            .map(|placed| placed.order_id.clone())
            .collect()
    }
}

#[async_trait]
impl EventHandler for Collector {
    async fn handle(
        &self,
        ctx: DeliveryContext,
        topic: &str,
        event: Box<dyn Event>,
    ) -> anyhow::Result<()> {
        self.received.lock().push(Received {
            ctx,
            topic: topic.to_string(),
            event,
        });
        Ok(())
    }
}
