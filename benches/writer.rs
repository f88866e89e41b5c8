//! Throughput benchmarks for the streaming writer, in the same
//! criterion-based style as `jafreck-lz4r`'s `benches/` suite.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use minlz::{Writer, WriterBuilder};
use std::io::{Sink, Write};

fn bench_payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| ((i * 2654435761) % 256) as u8).collect()
}

fn bench_concurrency(c: &mut Criterion) {
    let mut group = c.benchmark_group("writer_concurrency");
    let payload = bench_payload(4 * 1024 * 1024);
    group.throughput(Throughput::Bytes(payload.len() as u64));

    for concurrency in [1usize, 2, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(concurrency), &concurrency, |b, &concurrency| {
            b.iter(|| {
                let mut w: Writer<Sink> =
                    Writer::with_builder(std::io::sink(), WriterBuilder::new().concurrency(concurrency)).unwrap();
                w.write_all(black_box(&payload)).unwrap();
                w.close().unwrap();
            });
        });
    }
    group.finish();
}

fn bench_block_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("writer_block_size");
    let payload = bench_payload(4 * 1024 * 1024);
    group.throughput(Throughput::Bytes(payload.len() as u64));

    for block_size in [64 * 1024usize, 256 * 1024, 1024 * 1024, 4 * 1024 * 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(block_size), &block_size, |b, &block_size| {
            b.iter(|| {
                let mut w: Writer<Sink> = Writer::with_builder(
                    std::io::sink(),
                    WriterBuilder::new().concurrency(4).block_size(block_size),
                )
                .unwrap();
                w.write_all(black_box(&payload)).unwrap();
                w.close().unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_concurrency, bench_block_size);
criterion_main!(benches);
