use criterion::{black_box, criterion_group, criterion_main, Criterion};
use croupier::fairness::{self, SeedPair};

fn bench_derive(c: &mut Criterion) {
    let seed = SeedPair::from_parts(vec![7u8; 32], "bench-client", 0);

    c.bench_function("derive_outcome", |b| {
        let mut nonce = 0u64;
        b.iter(|| {
            nonce += 1;
            black_box(fairness::derive_outcome(&seed, nonce))
        })
    });

    c.bench_function("crash_multiplier_pipeline", |b| {
        let mut nonce = 0u64;
        b.iter(|| {
            nonce += 1;
            let digest = fairness::derive_outcome(&seed, nonce);
            let unit = fairness::outcome_to_unit_float(&digest);
            black_box(fairness::outcome_to_crash_multiplier(unit, 0.01, 1.0, 10_000.0))
        })
    });
}

criterion_group!(benches, bench_derive);
criterion_main!(benches);
