//! ANN Benchmarks
//!
//! Run with: cargo bench --bench ann_search
//!
//! - ann_insert: Single inserts into a growing index
//! - ann_search: k-NN search across k values and index sizes
//! - ann_search_exact: Brute-force baseline
//! - ann_filtered_query: Query executor with a string predicate
//! - ann_metric_comparison: Distance metric cost during search

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use strata_ann::{
    AnnSearcher, DistanceMetric, EntityId, HnswIndex, InMemoryRepository, IndexConfig,
    QueryEngine, Record,
};

// ============================================================================
// Constants and Utilities
// ============================================================================

/// Fixed seed for reproducible benchmarks
const BENCH_SEED: u64 = 0xDEADBEEF_CAFEBABE;

const DIMENSION: usize = 128;

/// Common index sizes
const INDEX_SIZES: [usize; 3] = [1_000, 10_000, 50_000];

/// Common k values for search
const K_VALUES: [usize; 3] = [1, 10, 100];

fn random_vectors(count: usize, dimension: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..dimension).map(|_| rng.gen_range(-1.0f32..1.0)).collect())
        .collect()
}

fn build_index(metric: DistanceMetric, vectors: &[Vec<f32>]) -> Arc<HnswIndex> {
    let config = IndexConfig::new(vectors[0].len(), metric).unwrap();
    let index = HnswIndex::new(config).unwrap();
    let batch: Vec<(EntityId, Vec<f32>)> = vectors
        .iter()
        .enumerate()
        .map(|(i, v)| (EntityId::new(i as u64 + 1), v.clone()))
        .collect();
    index.insert_batch(&batch).unwrap();
    Arc::new(index)
}

// ============================================================================
// ann_insert
// ============================================================================

fn ann_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("ann_insert");
    group.measurement_time(Duration::from_secs(10));
    group.throughput(Throughput::Elements(1));

    let vectors = random_vectors(20_000, DIMENSION, BENCH_SEED);
    group.bench_function("single", |b| {
        let config = IndexConfig::new(DIMENSION, DistanceMetric::Euclidean).unwrap();
        let index = HnswIndex::new(config).unwrap();
        let mut next = 0usize;
        b.iter(|| {
            let v = &vectors[next % vectors.len()];
            next += 1;
            // ids keep growing so no insert is rejected as a duplicate
            index.insert(EntityId::new(next as u64), black_box(v)).unwrap();
        });
    });

    group.finish();
}

// ============================================================================
// ann_search
// ============================================================================

fn ann_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("ann_search");
    group.measurement_time(Duration::from_secs(5));

    for &size in &INDEX_SIZES {
        let vectors = random_vectors(size, DIMENSION, BENCH_SEED);
        let index = build_index(DistanceMetric::Euclidean, &vectors);
        let queries = random_vectors(64, DIMENSION, BENCH_SEED + 1);

        for &k in &K_VALUES {
            group.bench_with_input(
                BenchmarkId::new(format!("k={}", k), size),
                &k,
                |b, &k| {
                    let mut i = 0usize;
                    b.iter(|| {
                        let q = &queries[i % queries.len()];
                        i += 1;
                        black_box(index.search(q, k).unwrap())
                    });
                },
            );
        }
    }

    group.finish();
}

fn ann_search_exact(c: &mut Criterion) {
    let mut group = c.benchmark_group("ann_search_exact");
    group.measurement_time(Duration::from_secs(5));

    for &size in &INDEX_SIZES[..2] {
        let vectors = random_vectors(size, DIMENSION, BENCH_SEED);
        let index = build_index(DistanceMetric::Euclidean, &vectors);
        let query = random_vectors(1, DIMENSION, BENCH_SEED + 2).remove(0);

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(index.search_exact(&query, 10).unwrap()));
        });
    }

    group.finish();
}

// ============================================================================
// ann_filtered_query
// ============================================================================

fn ann_filtered_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("ann_filtered_query");
    group.measurement_time(Duration::from_secs(5));

    let size = 10_000;
    let vectors = random_vectors(size, DIMENSION, BENCH_SEED);
    let index = build_index(DistanceMetric::Euclidean, &vectors);
    let repo = Arc::new(InMemoryRepository::new());
    for i in 1..=size as u64 {
        let name = if i % 4 == 0 { "blue item" } else { "red item" };
        repo.put(Record::new(EntityId::new(i)).with("name", name));
    }
    let engine = QueryEngine::with_attribute_filter(repo)
        .with_index("vector", Arc::new(AnnSearcher::new(Arc::clone(&index))));
    let query_vector = random_vectors(1, DIMENSION, BENCH_SEED + 3).remove(0);

    group.bench_function("build_and_find_ids", |b| {
        b.iter(|| {
            let query = engine
                .query()
                .nearest_neighbors_f32("vector", &query_vector, 50)
                .contains_string("name", "blue", false)
                .build()
                .unwrap();
            black_box(query.find_ids().unwrap())
        });
    });

    group.finish();
}

// ============================================================================
// ann_metric_comparison
// ============================================================================

fn ann_metric_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("ann_metric_comparison");
    group.measurement_time(Duration::from_secs(5));

    let vectors = random_vectors(5_000, DIMENSION, BENCH_SEED);
    let query = random_vectors(1, DIMENSION, BENCH_SEED + 4).remove(0);

    for metric in [
        DistanceMetric::Euclidean,
        DistanceMetric::SquaredEuclidean,
        DistanceMetric::Cosine,
        DistanceMetric::DotProduct,
    ] {
        let index = build_index(metric, &vectors);
        group.bench_with_input(BenchmarkId::from_parameter(metric), &metric, |b, _| {
            b.iter(|| black_box(index.search(&query, 10).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    ann_insert,
    ann_search,
    ann_search_exact,
    ann_filtered_query,
    ann_metric_comparison
);
criterion_main!(benches);
