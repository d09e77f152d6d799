//! PMK derivation benchmarks (§4.6, §8.1).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pyrit_crypto::compute_pmk;

fn bench_compute_pmk(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_pmk");
    group.throughput(Throughput::Elements(1));

    group.bench_function(BenchmarkId::new("single", "barbarbar"), |b| {
        b.iter(|| black_box(compute_pmk(b"foo", b"barbarbar")));
    });

    group.finish();
}

fn bench_compute_pmk_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_pmk_batch");
    let batch_sizes: &[usize] = &[16, 128, 512];

    for &size in batch_sizes {
        let passwords: Vec<String> = (0..size).map(|i| format!("password{i:04}")).collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("cpu", size), &size, |b, _| {
            b.iter(|| {
                for pw in &passwords {
                    black_box(compute_pmk(b"foo", pw.as_bytes()));
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compute_pmk, bench_compute_pmk_batch);
criterion_main!(benches);
