//! # In-Memory Broker
//!
//! Process-local transport implementing both ports. Deliveries run inline
//! on the publishing task, one subscription per consumer group, chosen
//! round-robin within the group.

use crate::subscriber::DeliveryError;
use crate::transport::{
    DeliveryCallback, Delivery, SubscribeOptions, SubscriptionId, TransportError,
    TransportMessage, TransportPublisher, TransportSubscriber,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, warn};

struct SubscriptionEntry {
    id: SubscriptionId,
    group: String,
    callback: DeliveryCallback,
}

/// Result of delivering one message to one subscription.
#[derive(Debug)]
pub struct DeliveryOutcome {
    pub subscription_id: SubscriptionId,
    pub group: String,
    pub result: Result<(), DeliveryError>,
}

impl DeliveryOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// In-memory transport for tests and single-process deployments.
pub struct InMemoryBroker {
    /// Subscriptions by topic, in registration order.
    topics: RwLock<HashMap<String, Vec<SubscriptionEntry>>>,

    /// Round-robin cursor per (topic, group).
    cursors: RwLock<HashMap<(String, String), u64>>,

    closed: AtomicBool,

    messages_published: AtomicU64,

    delivery_failures: AtomicU64,
}

impl InMemoryBroker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            cursors: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
            messages_published: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
        }
    }

    /// Deliver `message` to one subscription per group on `topic` and
    /// return each outcome.
    pub async fn dispatch(&self, topic: &str, message: TransportMessage) -> Vec<DeliveryOutcome> {
        let targets = self.select_targets(topic);
        let mut outcomes = Vec::with_capacity(targets.len());

        for (id, group, callback) in targets {
            let delivery = Delivery {
                topic: topic.to_string(),
                subscription_id: id.clone(),
                message: message.clone(),
            };
            let result = callback(delivery).await;

            if let Err(ref e) = result {
                self.delivery_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    topic = topic,
                    subscription_id = %id,
                    group = %group,
                    error = %e,
                    "Delivery rejected by subscriber"
                );
            }

            outcomes.push(DeliveryOutcome {
                subscription_id: id,
                group,
                result,
            });
        }

        outcomes
    }

    fn select_targets(&self, topic: &str) -> Vec<(SubscriptionId, String, DeliveryCallback)> {
        let topics = self.topics.read();
        let Some(entries) = topics.get(topic) else {
            return Vec::new();
        };

        let mut groups: Vec<(&str, Vec<&SubscriptionEntry>)> = Vec::new();
        for entry in entries {
            match groups.iter_mut().find(|(g, _)| *g == entry.group) {
                Some((_, members)) => members.push(entry),
                None => groups.push((entry.group.as_str(), vec![entry])),
            }
        }

        let mut cursors = self.cursors.write();
        groups
            .into_iter()
            .map(|(group, members)| {
                let cursor = cursors
                    .entry((topic.to_string(), group.to_string()))
                    .or_insert(0);
                let chosen = members[(*cursor % members.len() as u64) as usize];
                *cursor = cursor.wrapping_add(1);
                (chosen.id.clone(), chosen.group.clone(), chosen.callback.clone())
            })
            .collect()
    }

    /// Number of subscriptions on `topic`.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.read().get(topic).map_or(0, Vec::len)
    }

    #[must_use]
    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn delivery_failures(&self) -> u64 {
        self.delivery_failures.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        Ok(())
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransportPublisher for InMemoryBroker {
    async fn publish(&self, topic: &str, message: TransportMessage) -> Result<(), TransportError> {
        self.ensure_open()?;
        self.messages_published.fetch_add(1, Ordering::Relaxed);

        let message_id = message.id.clone();
        let outcomes = self.dispatch(topic, message).await;
        let failed = outcomes.iter().filter(|o| !o.is_ok()).count();

        debug!(
            topic = topic,
            message_id = %message_id,
            receivers = outcomes.len(),
            failed = failed,
            "Message dispatched"
        );
        Ok(())
    }
}

#[async_trait]
impl TransportSubscriber for InMemoryBroker {
    async fn subscribe(
        &self,
        topic: &str,
        options: SubscribeOptions,
        callback: DeliveryCallback,
    ) -> Result<SubscriptionId, TransportError> {
        self.ensure_open()?;

        let id = uuid::Uuid::new_v4().to_string();
        self.topics
            .write()
            .entry(topic.to_string())
            .or_default()
            .push(SubscriptionEntry {
                id: id.clone(),
                group: options.group,
                callback,
            });

        debug!(topic = topic, subscription_id = %id, "Broker subscription added");
        Ok(id)
    }

    async fn unsubscribe(&self, subscription_id: &str) -> Result<(), TransportError> {
        let mut topics = self.topics.write();
        let mut removed = None;
        for (topic, entries) in topics.iter_mut() {
            if let Some(pos) = entries.iter().position(|e| e.id == subscription_id) {
                let entry = entries.remove(pos);
                let group_empty = entries.iter().all(|e| e.group != entry.group);
                removed = Some((topic.clone(), entry.group, group_empty));
                break;
            }
        }

        let Some((topic, group, group_empty)) = removed else {
            return Err(TransportError::UnknownSubscription(
                subscription_id.to_string(),
            ));
        };
        topics.retain(|_, entries| !entries.is_empty());

        // Lock order: topics, then cursors.
        if group_empty {
            self.cursors.write().remove(&(topic, group));
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Release);
        self.topics.write().clear();
        self.cursors.write().clear();
        debug!("Broker closed");
        Ok(())
    }
}
