use cert_depot::{Depot, FileDepot, SqliteDepot, SqliteDepotOptions, Tag};
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const PAYLOAD: &[u8] = &[b'x'; 2048];

fn bench_put_get(c: &mut Criterion, label: &str, depot: &dyn Depot) {
    let mut counter = 0u64;
    c.bench_function(&format!("{} put 2KB", label), |b| {
        b.iter_batched(
            || {
                counter += 1;
                Tag::certificate(format!("host-{}", counter))
            },
            |tag| depot.put(black_box(&tag), black_box(PAYLOAD)).unwrap(),
            BatchSize::SmallInput,
        );
    });

    let tag = Tag::certificate("bench-get");
    depot.put(&tag, PAYLOAD).unwrap();
    c.bench_function(&format!("{} get 2KB", label), |b| {
        b.iter(|| depot.get(black_box(&tag)).unwrap());
    });
    c.bench_function(&format!("{} check", label), |b| {
        b.iter(|| depot.check(black_box(&tag)));
    });
}

fn bench_file(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let depot = FileDepot::new(dir.path()).unwrap();
    bench_put_get(c, "FileDepot", &depot);
}

fn bench_sqlite(c: &mut Criterion) {
    let depot = SqliteDepot::open(&SqliteDepotOptions::default()).unwrap();
    bench_put_get(c, "SqliteDepot", &depot);
}

criterion_group!(benches, bench_file, bench_sqlite);
criterion_main!(benches);
