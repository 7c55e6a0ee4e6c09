//! # Delivery Flows
//!
//! Publish → in-memory broker → subscribe, through the real codec.
//!
//! ## Flows Tested:
//!
//! 1. **Round trip**: the handler receives an event equal to the one sent
//! 2. **Type resolution**: several event types share one topic
//! 3. **Normalization**: identity values arrive trimmed and lowercased
//! 4. **Consumer groups**: each group once, round-robin inside a group

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::*;
    use event_bus::{handler_fn, PublishError, SubscribeError, TransportError, TransportSubscriber};
    use event_types::{
        Metadata, HEADER_EVENT_ID, HEADER_EVENT_SOURCE, HEADER_EVENT_TYPE, HEADER_SCHEMA_VERSION,
    };
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_published_event_reaches_handler_unchanged() {
        let bus = TestBus::new();
        let collector = Collector::default();
        bus.subscriber
            .subscribe(ORDERS_TOPIC, "billing", collector.clone())
            .await
            .unwrap();

        let mut placed = OrderPlaced::new("o-1", 4200);
        bus.publisher.publish(ORDERS_TOPIC, &mut placed).await.unwrap();

        let mut received = collector.take();
        assert_eq!(received.len(), 1);
        let delivery = received.remove(0);
        assert_eq!(delivery.topic, ORDERS_TOPIC);

        let decoded = delivery.event.downcast::<OrderPlaced>().unwrap();
        assert_eq!(*decoded, placed);

        let snapshot = bus.metrics.snapshot();
        assert_eq!(snapshot.encoded, 1);
        assert_eq!(snapshot.decoded, 1);
        assert_eq!(snapshot.published, 1);
    }

    #[tokio::test]
    async fn test_types_resolved_per_message() {
        let bus = TestBus::new();
        let collector = Collector::default();
        bus.subscriber
            .subscribe(ORDERS_TOPIC, "audit", collector.clone())
            .await
            .unwrap();

        bus.publisher
            .publish(ORDERS_TOPIC, &mut OrderPlaced::new("o-2", 100))
            .await
            .unwrap();
        bus.publisher
            .publish(ORDERS_TOPIC, &mut OrderCancelled::new("o-2", "customer request"))
            .await
            .unwrap();

        let received = collector.take();
        assert_eq!(received.len(), 2);
        assert!(received[0].event.downcast_ref::<OrderPlaced>().is_some());

        let cancelled = received[1].event.downcast_ref::<OrderCancelled>().unwrap();
        assert_eq!(cancelled.order_id, "o-2");
        assert_eq!(cancelled.reason, "customer request");
    }

    #[tokio::test]
    async fn test_identity_values_normalized_end_to_end() {
        let bus = TestBus::new();
        let collector = Collector::default();
        bus.subscriber
            .subscribe(ORDERS_TOPIC, "billing", collector.clone())
            .await
            .unwrap();

        let mut placed = OrderPlaced {
            metadata: Metadata::new(" V1 ", "  Orders", "ORDER.Placed ").with_event_id("  o-3-id "),
            order_id: "o-3".to_string(),
            amount_cents: 1,
        };
        bus.publisher.publish(ORDERS_TOPIC, &mut placed).await.unwrap();

        // normalized in place on the sending side
        assert_eq!(placed.metadata.schema_version.as_str(), "v1");
        assert_eq!(placed.metadata.event_id, "o-3-id");

        let received = collector.take();
        let metadata = received[0].event.metadata().unwrap();
        assert_eq!(metadata.schema_version.as_str(), SCHEMA_V1);
        assert_eq!(metadata.event_source.as_str(), ORDERS_SOURCE);
        assert_eq!(metadata.event_type.as_str(), ORDER_PLACED);
        assert_eq!(metadata.event_id, "o-3-id");
    }

    #[tokio::test]
    async fn test_delivery_context_carries_headers() {
        let bus = TestBus::new();
        let collector = Collector::default();
        let subscription_id = bus
            .subscriber
            .subscribe(ORDERS_TOPIC, "billing", collector.clone())
            .await
            .unwrap();

        let mut placed = OrderPlaced::new("o-4", 10);
        bus.publisher.publish(ORDERS_TOPIC, &mut placed).await.unwrap();

        let received = collector.take();
        let ctx = &received[0].ctx;
        assert_eq!(ctx.subscription_id, subscription_id);
        assert_eq!(ctx.group, "billing");
        assert_eq!(ctx.message_id, placed.metadata.event_id);
        assert_eq!(ctx.headers[HEADER_SCHEMA_VERSION], SCHEMA_V1);
        assert_eq!(ctx.headers[HEADER_EVENT_ID], placed.metadata.event_id);
        assert_eq!(ctx.headers[HEADER_EVENT_SOURCE], ORDERS_SOURCE);
        assert_eq!(ctx.headers[HEADER_EVENT_TYPE], ORDER_PLACED);

        let mut from_headers = Metadata::from_headers(&ctx.headers);
        from_headers.validate().unwrap();
        assert_eq!(from_headers, placed.metadata);
    }

    #[tokio::test]
    async fn test_each_group_receives_once_round_robin_within() {
        let bus = TestBus::new();
        let billing = Collector::default();
        let shipping_a = Collector::default();
        let shipping_b = Collector::default();

        bus.subscriber
            .subscribe(ORDERS_TOPIC, "billing", billing.clone())
            .await
            .unwrap();
        bus.subscriber
            .subscribe(ORDERS_TOPIC, "shipping", shipping_a.clone())
            .await
            .unwrap();
        bus.subscriber
            .subscribe(ORDERS_TOPIC, "shipping", shipping_b.clone())
            .await
            .unwrap();

        for id in ["o-5", "o-6", "o-7", "o-8"] {
            bus.publisher
                .publish(ORDERS_TOPIC, &mut OrderPlaced::new(id, 1))
                .await
                .unwrap();
        }

        assert_eq!(billing.placed_order_ids(), ["o-5", "o-6", "o-7", "o-8"]);
        assert_eq!(shipping_a.placed_order_ids(), ["o-5", "o-7"]);
        assert_eq!(shipping_b.placed_order_ids(), ["o-6", "o-8"]);
    }

    #[tokio::test]
    async fn test_other_topics_not_delivered() {
        let bus = TestBus::new();
        let collector = Collector::default();
        bus.subscriber
            .subscribe("payments.events", "billing", collector.clone())
            .await
            .unwrap();

        bus.publisher
            .publish(ORDERS_TOPIC, &mut OrderPlaced::new("o-9", 1))
            .await
            .unwrap();
        assert!(collector.is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let bus = TestBus::new();
        let collector = Collector::default();
        let id = bus
            .subscriber
            .subscribe(ORDERS_TOPIC, "billing", collector.clone())
            .await
            .unwrap();

        bus.subscriber.unsubscribe(&id).await.unwrap();
        bus.publisher
            .publish(ORDERS_TOPIC, &mut OrderPlaced::new("o-10", 1))
            .await
            .unwrap();
        assert!(collector.is_empty());

        assert!(matches!(
            bus.subscriber.unsubscribe(&id).await,
            Err(SubscribeError::Transport(TransportError::UnknownSubscription(_)))
        ));
    }

    #[tokio::test]
    async fn test_subscribe_validates_arguments() {
        let bus = TestBus::new();
        assert!(matches!(
            bus.subscriber.subscribe(" ", "billing", Collector::default()).await,
            Err(SubscribeError::EmptyTopic)
        ));
        assert!(matches!(
            bus.subscriber.subscribe(ORDERS_TOPIC, "", Collector::default()).await,
            Err(SubscribeError::EmptyGroup)
        ));
        assert_eq!(bus.broker.subscriber_count(ORDERS_TOPIC), 0);
    }

    #[tokio::test]
    async fn test_closed_transport_surfaces_on_publish() {
        let bus = TestBus::new();
        bus.subscriber.close().await.unwrap();

        let err = bus
            .publisher
            .publish(ORDERS_TOPIC, &mut OrderPlaced::new("o-11", 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PublishError::Transport { source: TransportError::Closed, .. }
        ));
        assert_eq!(bus.metrics.snapshot().publish_failures, 1);
        assert!(bus.broker.is_closed());
    }

    #[tokio::test]
    async fn test_closure_handler() {
        let bus = TestBus::new();
        let totals = Arc::new(Mutex::new(0u64));
        let sink = totals.clone();

        bus.subscriber
            .subscribe(
                ORDERS_TOPIC,
                "reporting",
                handler_fn(move |_ctx, _topic, event| {
                    let sink = sink.clone();
                    async move {
                        if let Some(placed) = event.downcast_ref::<OrderPlaced>() {
                            *sink.lock() += placed.amount_cents;
                        }
                        Ok(())
                    }
                }),
            )
            .await
            .unwrap();

        for amount in [250, 750] {
            bus.publisher
                .publish(ORDERS_TOPIC, &mut OrderPlaced::new("o-12", amount))
                .await
                .unwrap();
        }
        assert_eq!(*totals.lock(), 1000);
    }

    #[tokio::test]
    async fn test_broker_close_through_port() {
        let bus = TestBus::new();
        TransportSubscriber::close(bus.broker.as_ref()).await.unwrap();
        assert!(bus
            .subscriber
            .subscribe(ORDERS_TOPIC, "billing", Collector::default())
            .await
            .is_err());
    }
}
