//! Routing benchmarks for switchboard-core.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use switchboard_core::{Event, Relay, Router};
use switchboard_protocol::{codec, Request};
use switchboard_transport::{ConnectionId, Outbox};

fn all_open(_: &ConnectionId) -> bool {
    true
}

/// Router-only fan-out, no encoding or delivery.
fn bench_router_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("router_publish");

    for members in [2usize, 10, 100] {
        let mut router = Router::new();
        let ids: Vec<ConnectionId> = (0..members)
            .map(|i| ConnectionId::new(format!("conn-{i}")))
            .collect();
        for id in &ids {
            router.join(id, Some("room"), None, all_open);
        }

        group.bench_with_input(BenchmarkId::from_parameter(members), &ids[0], |b, sender| {
            b.iter(|| router.publish(black_box(sender), Some("room"), Some(json!("hi")), all_open))
        });
    }

    group.finish();
}

/// Full relay path: decode, route, encode and queue to every member.
fn bench_relay_message(c: &mut Criterion) {
    let mut group = c.benchmark_group("relay_message");

    for members in [2usize, 10, 100] {
        let mut relay = Relay::new();
        let mut receivers = Vec::with_capacity(members);
        let join = Bytes::from(codec::encode(&Request::join("room", None)).unwrap());

        for i in 0..members {
            let id = ConnectionId::new(format!("conn-{i}"));
            let (outbox, rx) = Outbox::channel(id.clone());
            relay.handle(Event::Opened(outbox));
            relay.handle(Event::Received(id, join.clone()));
            receivers.push(rx);
        }

        let sender = ConnectionId::new("conn-0");
        let raw = Bytes::from(
            codec::encode(&Request::message("room", json!({"command": "ping"}))).unwrap(),
        );

        group.bench_with_input(BenchmarkId::from_parameter(members), &raw, |b, raw| {
            b.iter(|| {
                let report = relay.handle(Event::Received(sender.clone(), raw.clone()));
                for rx in &mut receivers {
                    while rx.try_recv().is_ok() {}
                }
                report
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_router_publish, bench_relay_message);
criterion_main!(benches);
