use criterion::{black_box, criterion_group, criterion_main, Criterion};
use unikmer::index::popcount::{accumulate_batch, position_popcount};

fn criterion_benchmark(c: &mut Criterion) {
    let column: Vec<u8> = (0..4096u32).map(|i| (i % 256) as u8).collect();
    c.bench_function("position_popcount_4096_rows", |b| {
        b.iter(|| position_popcount(black_box(&column)))
    });

    let num_row_bytes = 128;
    let rows: Vec<Vec<u8>> = (0..64)
        .map(|r| (0..num_row_bytes).map(|i| ((r + i) % 256) as u8).collect())
        .collect();
    c.bench_function("accumulate_batch_64x128", |b| {
        b.iter(|| {
            let mut counts = vec![[0u64; 8]; num_row_bytes];
            accumulate_batch(black_box(&rows), num_row_bytes, &mut counts);
            counts
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
