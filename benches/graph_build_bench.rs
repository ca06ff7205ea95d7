//! Graph construction benchmarks.
//!
//! Measures NNDescent inside a single bucket and the full LSH pipeline for
//! various stage and bucket configurations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lsh_knn_graph::{
    build_graph, BruteForce, GraphBuilder, GraphConfig, NNDescent, NNDescentParams, Similarity,
    SparseDataset,
};

fn benchmark_local_builders(c: &mut Criterion) {
    let similarity = Similarity::Cosine;

    for size in [500, 2000] {
        let dataset = SparseDataset::generate(size, 2000, 30, 20, 7);
        let mut group = c.benchmark_group(format!("local_build_{}", size));
        group.sample_size(10);

        let nndescent = NNDescent::new(NNDescentParams {
            k: 10,
            ..Default::default()
        })
        .unwrap();
        group.bench_function("nndescent", |b| {
            b.iter(|| black_box(nndescent.build(&dataset.nodes, &similarity, 42)))
        });

        let brute = BruteForce::new(10);
        group.bench_function("brute_force", |b| {
            b.iter(|| black_box(brute.build(&dataset.nodes, &similarity, 42)))
        });

        group.finish();
    }
}

fn benchmark_pipeline(c: &mut Criterion) {
    let dataset = SparseDataset::generate(10_000, 5000, 40, 50, 3);
    let pairs = dataset.pairs();

    let mut group = c.benchmark_group("pipeline_10k");
    group.sample_size(10);

    for (stages, buckets) in [(1, 10), (2, 10), (4, 20)] {
        let config = GraphConfig::new(dataset.dim)
            .with_k(10)
            .with_stages(stages)
            .with_buckets(buckets);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("s{}_b{}", stages, buckets)),
            &config,
            |b, config| b.iter(|| black_box(build_graph(pairs.clone(), config).unwrap())),
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_local_builders, benchmark_pipeline);
criterion_main!(benches);
