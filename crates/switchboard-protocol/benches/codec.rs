//! Codec benchmarks for switchboard-protocol.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde_json::json;
use switchboard_protocol::{codec, Request, ServerEnvelope};

fn bench_decode_join(c: &mut Criterion) {
    let raw = codec::encode(&Request::join("design:room", Some(json!(42)))).unwrap();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(raw.len() as u64));
    group.bench_function("join", |b| b.iter(|| codec::decode(black_box(raw.as_bytes()))));
    group.finish();
}

fn bench_decode_message(c: &mut Criterion) {
    let payload = json!({
        "id": "5f1c",
        "command": "set_fill_color",
        "params": {"nodeId": "12:34", "r": 0.2, "g": 0.4, "b": 0.6, "a": 1.0}
    });
    let raw = codec::encode(&Request::message("design:room", payload)).unwrap();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(raw.len() as u64));
    group.bench_function("message", |b| {
        b.iter(|| codec::decode(black_box(raw.as_bytes())))
    });
    group.finish();
}

fn bench_encode_broadcast(c: &mut Criterion) {
    let envelope = ServerEnvelope::broadcast("design:room", Some(json!({"text": "x".repeat(256)})));

    c.bench_function("encode_broadcast_256B", |b| {
        b.iter(|| codec::encode(black_box(&envelope)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_decode_join,
    bench_decode_message,
    bench_encode_broadcast
);
criterion_main!(benches);
