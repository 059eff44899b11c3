use criterion::{black_box, criterion_group, criterion_main, Criterion};
use unikmer::unikfile::varbyte::{read_pair, write_pair};

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("write_pair_small_delta", |b| {
        b.iter(|| {
            let mut buf = Vec::with_capacity(9);
            write_pair(&mut buf, black_box(1), black_box(Some(2))).unwrap();
            buf
        })
    });

    c.bench_function("write_pair_large_delta", |b| {
        b.iter(|| {
            let mut buf = Vec::with_capacity(17);
            write_pair(&mut buf, black_box(u64::MAX / 3), black_box(Some(u64::MAX / 7))).unwrap();
            buf
        })
    });

    let mut encoded = Vec::new();
    write_pair(&mut encoded, 12345, Some(67890)).unwrap();
    c.bench_function("read_pair", |b| {
        b.iter(|| read_pair(&mut black_box(&encoded[..]), true).unwrap())
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
