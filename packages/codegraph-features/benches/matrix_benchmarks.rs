//! Accumulation benchmarks
//!
//! - raw matrix increments across growth boundaries
//! - vocabulary resolution (hit-heavy vs miss-heavy)
//! - full pipeline over an in-memory adapter

use codegraph_features::{
    canonicalize, ExtractionPipeline, InMemoryAdapter, RawPathRecord, SparseCountMatrix, VocabularyIndex,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn record(i: usize) -> RawPathRecord {
    RawPathRecord::new(
        ["IdentifierDeclStatement", "Identifier"],
        ["FLOWS_TO", if i % 2 == 0 { "REACHES" } else { "CONTROLS" }],
        [format!("CallExpression{}", i)],
    )
}

fn bench_matrix_increment(c: &mut Criterion) {
    let mut group = c.benchmark_group("matrix_increment");

    for size in [1_000usize, 10_000, 100_000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let mut matrix = SparseCountMatrix::new();
                for i in 0..size {
                    matrix.increment(i / 50, (i * 7) % 997, 1).unwrap();
                }
                black_box(matrix.nnz())
            });
        });
    }

    group.finish();
}

fn bench_vocabulary(c: &mut Criterion) {
    let mut group = c.benchmark_group("vocabulary_resolve");

    for distinct in [10usize, 10_000] {
        let keys: Vec<_> = (0..10_000).map(|i| canonicalize(&record(i % distinct))).collect();
        group.bench_with_input(BenchmarkId::from_parameter(distinct), &keys, |b, keys| {
            b.iter(|| {
                let vocab = VocabularyIndex::new();
                for key in keys {
                    black_box(vocab.resolve_or_create(key.clone()));
                }
                vocab.len()
            });
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut adapter = InMemoryAdapter::new();
    for s in 0..200 {
        let entries: Vec<Vec<RawPathRecord>> = (0..4)
            .map(|e| (0..25).map(|p| record((s * 13 + e * 7 + p) % 500)).collect())
            .collect();
        adapter = adapter.with_sample(format!("/data/juliet/good/s__{:04}", s), s % 2 == 0, entries);
    }

    c.bench_function("pipeline_200_samples", |b| {
        b.iter(|| {
            let output = ExtractionPipeline::new(adapter.clone()).extract().unwrap();
            black_box(output.report.nnz)
        });
    });
}

criterion_group!(benches, bench_matrix_increment, bench_vocabulary, bench_pipeline);
criterion_main!(benches);
