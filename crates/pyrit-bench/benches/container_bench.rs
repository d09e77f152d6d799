//! PAW2 and PYR2 container codec benchmarks (§4.1).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pyrit_core::{Essid, Password};
use pyrit_storage::{paw2, pyr2};

fn passwords(n: usize) -> Vec<Password> {
    (0..n).map(|i| Password::new(format!("benchpw{i:05}")).unwrap()).collect()
}

fn bench_paw2_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("paw2_round_trip");
    for &size in &[100usize, 1_000, 10_000] {
        let pws = passwords(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("encode", size), &size, |b, _| {
            b.iter(|| black_box(paw2::encode(&pws)));
        });

        let (_, encoded) = paw2::encode(&pws);
        group.bench_with_input(BenchmarkId::new("decode", size), &size, |b, _| {
            b.iter(|| black_box(paw2::decode(&encoded).unwrap()));
        });
    }
    group.finish();
}

fn bench_pyr2_round_trip(c: &mut Criterion) {
    let essid = Essid::new(b"benchnet".to_vec()).unwrap();
    let mut group = c.benchmark_group("pyr2_round_trip");
    for &size in &[100usize, 1_000, 10_000] {
        let results: Vec<_> = passwords(size).into_iter().map(|pw| (pw, [7u8; 32])).collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("encode", size), &size, |b, _| {
            b.iter(|| black_box(pyr2::encode(&essid, &results)));
        });

        let encoded = pyr2::encode(&essid, &results);
        group.bench_with_input(BenchmarkId::new("decode", size), &size, |b, _| {
            b.iter(|| black_box(pyr2::decode(&encoded).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_paw2_round_trip, bench_pyr2_round_trip);
criterion_main!(benches);
