use ark_bn254::{Fr, G1Affine};
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{Field, UniformRand};
use criterion::{criterion_group, criterion_main, Criterion};
use rand::Rng;
use rust_eigenda_primitives::{blob::Blob, payload::Payload, PolynomialForm};
use rust_eigenda_prover::{kzg::KZG, srs::SRS};
use std::time::Duration;

fn bench_kzg_commit(c: &mut Criterion) {
    let mut rng = rand::thread_rng();
    let kzg = KZG::new();

    let tau = Fr::rand(&mut rng);
    let mut power = Fr::ONE;
    let mut g1 = Vec::with_capacity(4096);
    for _ in 0..4096 {
        g1.push((G1Affine::generator() * power).into_affine());
        power *= tau;
    }
    let srs = SRS::from_points(g1, 4096).unwrap();

    for size in [10_000usize, 30_000, 50_000] {
        c.bench_function(&format!("bench_kzg_commit_{}", size), |b| {
            let random_payload: Vec<u8> =
                (0..size).map(|_| rng.gen_range(32..=126) as u8).collect();
            let blob =
                Blob::from_payload(&Payload::new(random_payload), PolynomialForm::Coeff).unwrap();
            b.iter(|| kzg.commit_blob(&blob, &srs).unwrap());
        });
    }
}

fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(Duration::from_secs(5))
        .measurement_time(Duration::from_secs(10))
        .sample_size(10)
}

criterion_group!(
    name = benches;
    config = criterion_config();
    targets = bench_kzg_commit
);
criterion_main!(benches);
