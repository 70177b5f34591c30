use criterion::{criterion_group, criterion_main, Criterion};
use rand::Rng;
use rust_eigenda_primitives::{blob::Blob, payload::Payload, PolynomialForm};
use std::time::Duration;

fn bench_blob_codec(c: &mut Criterion) {
    let mut rng = rand::thread_rng();

    for size in [10_000usize, 100_000, 1_000_000] {
        let payload = Payload::new((0..size).map(|_| rng.gen::<u8>()).collect());

        c.bench_function(&format!("bench_payload_to_coeff_blob_{}", size), |b| {
            b.iter(|| Blob::from_payload(&payload, PolynomialForm::Coeff).unwrap());
        });

        let blob = Blob::from_payload(&payload, PolynomialForm::Coeff).unwrap();
        c.bench_function(&format!("bench_coeff_blob_to_payload_{}", size), |b| {
            b.iter(|| blob.to_payload().unwrap());
        });

        let blob = Blob::from_payload(&payload, PolynomialForm::Eval).unwrap();
        c.bench_function(&format!("bench_eval_blob_to_payload_{}", size), |b| {
            b.iter(|| blob.to_payload().unwrap());
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
    targets = bench_blob_codec
);
criterion_main!(benches);
