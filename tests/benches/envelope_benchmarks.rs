//! # Envelope Benchmarks
//!
//! Encode/decode throughput for the envelope codec across payload sizes,
//! plus a full publish → deliver pass over the in-memory broker.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use event_bus::{EnvelopeCodec, EventPublisher, EventSubscriber, InMemoryBroker};
use event_tests::integration::fixtures::{
    order_registry, Collector, OrderCancelled, OrderPlaced, ORDERS_TOPIC,
};
use std::sync::Arc;

const REASON_SIZES: [usize; 4] = [16, 256, 4096, 65536];

fn cancelled_with_reason(len: usize) -> OrderCancelled {
    OrderCancelled::new("o-bench", &"x".repeat(len))
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope-encode");
    let codec = EnvelopeCodec::new(order_registry());

    for size in REASON_SIZES {
        let mut event = cancelled_with_reason(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(codec.encode(&mut event).is_ok()))
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope-decode");
    let codec = EnvelopeCodec::new(order_registry());

    for size in REASON_SIZES {
        let mut event = cancelled_with_reason(size);
        let Ok(encoded) = codec.encode(&mut event) else {
            panic!("benchmark event failed to encode");
        };

        group.throughput(Throughput::Bytes(encoded.body.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &encoded.body, |b, body| {
            b.iter(|| black_box(codec.decode(body).is_ok()))
        });
    }

    group.finish();
}

fn bench_publish_deliver(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");

    let codec = Arc::new(EnvelopeCodec::new(order_registry()));
    let broker = Arc::new(InMemoryBroker::new());
    let publisher = EventPublisher::new(broker.clone(), codec.clone());
    let subscriber = EventSubscriber::new(broker.clone(), codec);
    let collector = Collector::default();

    runtime
        .block_on(subscriber.subscribe(ORDERS_TOPIC, "bench", collector.clone()))
        .expect("subscribe");

    c.bench_function("publish-deliver-roundtrip", |b| {
        b.iter(|| {
            let mut placed = OrderPlaced::new("o-bench", 1);
            runtime
                .block_on(publisher.publish(ORDERS_TOPIC, &mut placed))
                .expect("publish");
            collector.take();
        })
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_publish_deliver);
criterion_main!(benches);
