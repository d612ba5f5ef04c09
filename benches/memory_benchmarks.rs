use chrono::{Duration, NaiveDate};
use criterion::BenchmarkId;
use criterion::Throughput;
use criterion::{criterion_group, criterion_main, Criterion};
use layermem::memory::{EngineConfig, HashingEmbedder, MemoryEngine, QueryRequest};

const DIM: usize = 128;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 1, 3).unwrap()
}

fn engine_with(entries: usize) -> MemoryEngine {
    let config = EngineConfig {
        embedding_dimension: DIM,
        ..EngineConfig::new(["TSLA"])
    };
    let mut engine = MemoryEngine::new(config, Box::new(HashingEmbedder::new(DIM))).unwrap();
    for i in 0..entries {
        let date = start() + Duration::days((i / 10) as i64);
        engine
            .ingest(&format!("headline {} about deliveries and margins", i), date, None)
            .unwrap();
    }
    engine
}

fn benchmark_ingest(c: &mut Criterion) {
    let mut engine = engine_with(0);
    let mut i = 0;

    c.bench_function("ingest", |b| {
        b.iter(|| {
            engine
                .ingest(&format!("news item {}", i), start(), None)
                .unwrap();
            i += 1;
        });
    });
}

fn benchmark_step(c: &mut Criterion) {
    let mut engine = engine_with(1000);
    let mut date = start();

    c.bench_function("step 1000 entries", |b| {
        b.iter(|| {
            date += Duration::days(1);
            engine.step(date).unwrap();
        });
    });
}

fn benchmark_query_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_sizes");

    for size in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let engine = engine_with(size);
            let request = QueryRequest::new(start() + Duration::days(365))
                .with_context("vehicle deliveries guidance");

            b.iter(|| {
                engine.query(&request).unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_ingest,
    benchmark_step,
    benchmark_query_sizes
);
criterion_main!(benches);
