use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use cipher_algebra::{RelinearizationPolicy, Session};

fn bench_session_setup(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_setup");
    group.sample_size(10);

    for depth in [1usize, 2, 3] {
        group.bench_with_input(BenchmarkId::new("depth", depth), &depth, |b, &depth| {
            b.iter(|| {
                Session::builder()
                    .max_multiplicative_depth(depth)
                    .seed(7)
                    .build()
                    .expect("session")
            });
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let session = Session::builder().seed(123).build().expect("session");

    for &size in &[16usize, 1024, 4096] {
        let values: Vec<f64> = (0..size).map(|i| (i as f64) * 0.01).collect();
        group.bench_function(format!("encrypt_decrypt_{size}_slots"), |b| {
            b.iter(|| {
                let ct = session.encrypt(black_box(values.clone())).expect("encrypt");
                black_box(session.decrypt(&ct).expect("decrypt"))
            });
        });
    }

    let x = session.encrypt(1.5).expect("encrypt");
    let y = session.encrypt(2.5).expect("encrypt");
    group.bench_function("add", |b| b.iter(|| black_box((&x + &y).expect("add"))));
    group.bench_function("mul_relinearize_rescale", |b| {
        b.iter(|| black_box((&x * &y).expect("mul")))
    });
    group.bench_function("mul_scalar", |b| b.iter(|| black_box((&x * 3.0).expect("mul"))));
    group.bench_function("affine", |b| {
        b.iter(|| black_box(((&x * 3.0).expect("mul") + 1.0).expect("add")))
    });

    group.finish();
}

fn bench_deferred_relinearization(c: &mut Criterion) {
    let mut group = c.benchmark_group("relinearization_policy");
    for policy in [RelinearizationPolicy::Immediate, RelinearizationPolicy::Deferred] {
        let session = Session::builder()
            .relinearization(policy)
            .seed(9)
            .build()
            .expect("session");
        let x = session.encrypt(1.5).expect("encrypt");
        let y = session.encrypt(2.5).expect("encrypt");
        group.bench_function(format!("{policy:?}"), |b| {
            b.iter(|| black_box((((&x * &y).expect("mul")) + &x).expect("add")))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_session_setup,
    bench_pipeline,
    bench_deferred_relinearization
);
criterion_main!(benches);
