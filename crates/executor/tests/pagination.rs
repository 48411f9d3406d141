//! Pagination and ordering laws
//!
//! Property tests over random datasets: score-order pages are contiguous
//! slices of the full result, id order re-sorts the same set, and building
//! the same query twice gives the same answers.

mod common;

use common::Fixture;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strata_ann_core::{AnnError, EntityId};

const NAMES: [&str; 6] = ["alpha", "beta", "gamma", "delta", "epsilon", "zeta"];

fn random_fixture(seed: u64, n: usize) -> Fixture {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut fx = Fixture::new(3);
    for i in 0..n {
        let v: Vec<f32> = (0..3).map(|_| rng.gen_range(0.0f32..10.0)).collect();
        fx.put(NAMES[i % NAMES.len()], &v);
    }
    fx
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_score_pages_are_contiguous(
        seed in 0u64..1000,
        k in 1usize..40,
        offset in 0usize..20,
        limit in 0usize..20,
    ) {
        let fx = random_fixture(seed, 60);
        let mut query = fx
            .engine
            .query()
            .nearest_neighbors("vector", &[5.0, 5.0, 5.0], k)
            .contains_string("name", "a", false)
            .build()
            .unwrap();

        let all = query.find_ids_with_scores().unwrap();
        prop_assert!(all.len() <= k);
        prop_assert_eq!(query.count().unwrap(), all.len());

        query.set_offset(offset).set_limit(limit);
        let page = query.find_ids_with_scores().unwrap();
        let end = if limit == 0 { all.len() } else { (offset + limit).min(all.len()) };
        let expected: Vec<(EntityId, f32)> = all.iter().skip(offset).take(end.saturating_sub(offset)).copied().collect();
        prop_assert_eq!(&page, &expected);

        // offset(0).limit(o + l) tail equals offset(o).limit(l)
        if limit > 0 {
            query.set_offset(0).set_limit(offset + limit);
            let prefix = query.find_ids_with_scores().unwrap();
            let tail: Vec<(EntityId, f32)> = prefix.into_iter().skip(offset).collect();
            prop_assert_eq!(tail, page);
        }
    }

    #[test]
    fn prop_id_order_is_same_set(
        seed in 0u64..1000,
        k in 1usize..40,
        offset in 0usize..10,
        limit in 0usize..10,
    ) {
        let fx = random_fixture(seed, 50);
        let mut query = fx
            .engine
            .query()
            .nearest_neighbors("vector", &[2.0, 8.0, 5.0], k)
            .ends_with_string("name", "A", false)
            .build()
            .unwrap();

        let mut by_score: Vec<EntityId> = query
            .find_ids_with_scores()
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        let by_id = query.find_ids().unwrap();
        by_score.sort();
        prop_assert_eq!(&by_score, &by_id);

        query.set_offset(offset).set_limit(limit);
        let page = query.find_ids().unwrap();
        let take = if limit == 0 { usize::MAX } else { limit };
        let expected: Vec<EntityId> = by_id.iter().skip(offset).take(take).copied().collect();
        prop_assert_eq!(page, expected);
    }

    #[test]
    fn prop_build_is_idempotent(seed in 0u64..1000, k in 1usize..30) {
        let fx = random_fixture(seed, 40);
        let builder = fx
            .engine
            .query()
            .nearest_neighbors("vector", &[1.0, 1.0, 1.0], k)
            .starts_with_string("name", "e", true);
        let a = builder.build().unwrap();
        let b = builder.build().unwrap();
        prop_assert_eq!(a.find_ids_with_scores().unwrap(), b.find_ids_with_scores().unwrap());
        prop_assert_eq!(a.find_ids().unwrap(), b.find_ids().unwrap());
    }
}

// ============================================================================
// Build validation
// ============================================================================

fn is_invalid_query<T: std::fmt::Debug>(result: Result<T, AnnError>) -> bool {
    matches!(result, Err(AnnError::InvalidQuery { .. }))
}

#[test]
fn test_build_rejects_malformed_queries() {
    let fx = random_fixture(1, 10);
    let engine = &fx.engine;

    assert!(is_invalid_query(engine.query().contains_string("name", "a", false).build()));
    assert!(is_invalid_query(
        engine
            .query()
            .nearest_neighbors("vector", &[1.0, 1.0, 1.0], 3)
            .nearest_neighbors("vector", &[2.0, 2.0, 2.0], 3)
            .build()
    ));
    assert!(is_invalid_query(
        engine.query().nearest_neighbors("vector", &[1.0, 1.0, 1.0], 0).build()
    ));
    assert!(is_invalid_query(
        engine.query().nearest_neighbors("embedding", &[1.0, 1.0, 1.0], 3).build()
    ));
    assert!(is_invalid_query(
        engine.query().nearest_neighbors("vector", &[1.0, 1.0], 3).build()
    ));
    assert!(is_invalid_query(
        engine.query().nearest_neighbors("vector", &[1.0, f32::NAN, 1.0], 3).build()
    ));
}

#[test]
fn test_empty_index_query_returns_nothing() {
    let fx = Fixture::new(2);
    let query = fx
        .engine
        .query()
        .nearest_neighbors("vector", &[1.0, 1.0], 5)
        .build()
        .unwrap();
    assert!(query.find_ids().unwrap().is_empty());
    assert!(query.find().unwrap().is_empty());
    assert_eq!(query.count().unwrap(), 0);
}
