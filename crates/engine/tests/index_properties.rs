//! Index Property Tests
//!
//! Determinism, ordering and deletion-repair properties of `HnswIndex`.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strata_ann_core::{DistanceMetric, EntityId, HnswParams, IndexConfig};
use strata_ann_engine::{HnswIndex, LevelGenerator, SearchOptions};

fn config(dim: usize, seed: u64) -> IndexConfig {
    IndexConfig::new(dim, DistanceMetric::Euclidean)
        .unwrap()
        .with_hnsw(HnswParams {
            m: 8,
            m0: 16,
            ef_construction: 64,
            ef_search: 32,
            ..HnswParams::default()
        })
        .with_seed(seed)
}

fn fill(index: &HnswIndex, seed: u64, n: u64, dim: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    for i in 1..=n {
        let v: Vec<f32> = (0..dim).map(|_| rng.gen_range(0.0f32..10.0)).collect();
        index.insert(EntityId::new(i), &v).unwrap();
    }
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_same_seed_same_results() {
    let a = HnswIndex::new(config(4, 9)).unwrap();
    let b = HnswIndex::new(config(4, 9)).unwrap();
    fill(&a, 1, 300, 4);
    fill(&b, 1, 300, 4);

    assert_eq!(a.stats().graph, b.stats().graph);
    let mut rng = StdRng::seed_from_u64(2);
    for _ in 0..20 {
        let q: Vec<f32> = (0..4).map(|_| rng.gen_range(0.0f32..10.0)).collect();
        assert_eq!(a.search(&q, 10).unwrap(), b.search(&q, 10).unwrap());
    }
}

#[test]
fn test_injected_rng_is_deterministic() {
    let make = || {
        let levels = LevelGenerator::new(
            Box::new(StdRng::seed_from_u64(11)),
            HnswParams::default().level_multiplier(),
        );
        HnswIndex::with_level_generator(config(3, 0), levels).unwrap()
    };
    let a = make();
    let b = make();
    fill(&a, 3, 200, 3);
    fill(&b, 3, 200, 3);
    assert_eq!(a.stats().graph, b.stats().graph);
    assert_eq!(
        a.search(&[5.0, 5.0, 5.0], 7).unwrap(),
        b.search(&[5.0, 5.0, 5.0], 7).unwrap()
    );
}

// ============================================================================
// Deletion repair
// ============================================================================

#[test]
fn test_delete_half_keeps_graph_valid_and_searchable() {
    let index = HnswIndex::new(config(3, 42)).unwrap();
    fill(&index, 4, 400, 3);

    for i in (2..=400).step_by(2) {
        index.delete(EntityId::new(i)).unwrap();
    }
    index.validate().unwrap();
    assert_eq!(index.len(), 200);

    let mut rng = StdRng::seed_from_u64(6);
    let mut recall = 0.0;
    for _ in 0..20 {
        let q: Vec<f32> = (0..3).map(|_| rng.gen_range(0.0f32..10.0)).collect();
        let hits = index.search_with(&q, 10, &SearchOptions::with_ef(64)).unwrap();
        assert!(hits.iter().all(|h| h.id.as_u64() % 2 == 1));
        let exact = index.search_exact(&q, 10).unwrap();
        recall += hits.iter().filter(|h| exact.contains(h)).count() as f64 / 10.0;
    }
    assert!(recall / 20.0 >= 0.9, "recall after deletes: {}", recall / 20.0);
}

#[test]
fn test_delete_then_reinsert_same_id() {
    let index = HnswIndex::new(config(2, 1)).unwrap();
    fill(&index, 8, 50, 2);
    index.delete(EntityId::new(7)).unwrap();
    index.insert(EntityId::new(7), &[100.0, 100.0]).unwrap();
    assert_eq!(index.search(&[100.0, 100.0], 1).unwrap()[0].id, EntityId::new(7));
    index.validate().unwrap();
}

// ============================================================================
// Ordering laws
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_results_ordered_and_bounded(
        points in prop::collection::vec((0.0f32..50.0, 0.0f32..50.0), 1..80),
        qx in 0.0f32..50.0,
        qy in 0.0f32..50.0,
        k in 1usize..20,
    ) {
        let index = HnswIndex::new(config(2, 3)).unwrap();
        for (i, (x, y)) in points.iter().enumerate() {
            index.insert(EntityId::new(i as u64 + 1), &[*x, *y]).unwrap();
        }

        let hits = index.search(&[qx, qy], k).unwrap();
        prop_assert!(hits.len() <= k);
        prop_assert_eq!(hits.len(), k.min(points.len()));
        for pair in hits.windows(2) {
            prop_assert!(
                pair[0].score < pair[1].score
                    || (pair[0].score == pair[1].score && pair[0].id < pair[1].id)
            );
        }

        let exact = index.search_exact(&[qx, qy], k).unwrap();
        for pair in exact.windows(2) {
            prop_assert!(pair[0].score <= pair[1].score);
        }
        prop_assert_eq!(exact.len(), hits.len());
    }
}
