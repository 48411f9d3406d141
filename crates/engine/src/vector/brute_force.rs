//! Brute-force exact search
//!
//! Simple O(n) scan over the `VectorStore`. This is the ground truth the
//! HNSW graph is measured against in recall tests, and it backs
//! `HnswIndex::search_exact`.
//!
//! Determinism contract:
//! 1. Iterate vectors in EntityId order (BTreeMap iteration)
//! 2. Compute distances (single-threaded)
//! 3. Sort by (distance asc, EntityId asc)
//! 4. Truncate to k

use strata_ann_core::{EntityId, SearchHit};

use crate::vector::distance::DistanceFunction;
use crate::vector::store::VectorStore;

/// Exact k nearest neighbors of `query` over every stored vector
pub fn exact_search(
    store: &VectorStore,
    distance: &dyn DistanceFunction,
    query: &[f32],
    k: usize,
) -> Vec<SearchHit> {
    exact_search_filtered(store, distance, query, k, |_| true)
}

/// Exact k nearest neighbors among the ids accepted by `keep`
pub fn exact_search_filtered<F>(
    store: &VectorStore,
    distance: &dyn DistanceFunction,
    query: &[f32],
    k: usize,
    keep: F,
) -> Vec<SearchHit>
where
    F: Fn(EntityId) -> bool,
{
    if k == 0 || store.is_empty() {
        return Vec::new();
    }

    let mut results: Vec<SearchHit> = store
        .iter()
        .filter(|(id, _)| keep(*id))
        .map(|(id, vector)| SearchHit::new(id, distance.distance(query, vector)))
        .collect();

    results.sort_by(SearchHit::cmp_by_score);
    results.truncate(k);
    results
}
