use checks::{Check, CheckId, CheckMethod, CheckStore, Payload};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn filled_store(n: usize) -> CheckStore {
    let store = CheckStore::with_capacity(n);
    for i in 0..n {
        let mut check = Check::new(
            format!("https://service-{}.example.com/health", i),
            CheckMethod::Post,
            Some(Payload::Text(format!("ping {}", i))),
        );
        check.req_time = Some(1_700_000_000_000);
        check.res_time = Some(1_700_000_000_120);
        check.status_code = Some(200);
        store.insert(CheckId::generate(), check).unwrap();
    }
    store
}

fn list_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_list");

    for size in [10, 100, 1000] {
        let store = filled_store(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &store, |b, store| {
            b.iter(|| black_box(store.list()));
        });
    }

    group.finish();
}

fn update_benchmark(c: &mut Criterion) {
    let store = filled_store(100);
    let (id, check) = store.list().into_iter().next().unwrap();

    c.bench_function("store_update", |b| {
        b.iter(|| store.update(black_box(&id), black_box(check.clone())).unwrap());
    });
}

fn snapshot_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_snapshot");
    let rt = tokio::runtime::Runtime::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checks.json");

    for size in [10, 100] {
        let store = filled_store(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &store, |b, store| {
            b.iter(|| rt.block_on(async { store.snapshot(&path).await.unwrap() }));
        });
    }

    group.finish();
}

criterion_group!(benches, list_benchmark, update_benchmark, snapshot_benchmark);
criterion_main!(benches);
