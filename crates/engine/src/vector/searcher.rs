//! AnnSearcher - filtered nearest neighbor search
//!
//! Composes an `HnswIndex` with an optional candidate filter. The filter is
//! an opaque `matches(id)` capability; the searcher knows nothing about
//! attributes or predicates.
//!
//! Two strategies (see `FilterStrategy`):
//! - `TopK`: the ANN top-k is the candidate universe; the filter keeps the
//!   subset of it that passes.
//! - `FillK`: widen the beam until k candidates pass, the index is
//!   exhausted, or `max_ef` is reached.

use std::sync::Arc;
use std::time::Instant;

use strata_ann_core::{AnnResult, EntityId, FilterStrategy, SearchConfig, SearchHit};
use tracing::{debug, warn};

use crate::vector::index::{HnswIndex, IndexReader, SearchOptions};

/// Candidate filter capability
pub trait CandidateFilter: Send + Sync {
    /// Whether `id` may appear in the result
    fn matches(&self, id: EntityId) -> bool;
}

impl<F> CandidateFilter for F
where
    F: Fn(EntityId) -> bool + Send + Sync,
{
    fn matches(&self, id: EntityId) -> bool {
        self(id)
    }
}

/// Filtered k-NN search over a shared index
#[derive(Debug, Clone)]
pub struct AnnSearcher {
    index: Arc<HnswIndex>,
    config: SearchConfig,
}

impl AnnSearcher {
    /// Searcher using the index's own search config
    pub fn new(index: Arc<HnswIndex>) -> Self {
        let config = index.config().search.clone();
        AnnSearcher { index, config }
    }

    /// Searcher with an explicit search config
    pub fn with_config(index: Arc<HnswIndex>, config: SearchConfig) -> Self {
        AnnSearcher { index, config }
    }

    /// Underlying index
    pub fn index(&self) -> &Arc<HnswIndex> {
        &self.index
    }

    /// Vector dimension of the underlying index
    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    /// Index mutation counter
    pub fn version(&self) -> u64 {
        self.index.version()
    }

    /// Configured strategy
    pub fn strategy(&self) -> FilterStrategy {
        self.config.filter_strategy
    }

    /// Up to k hits ordered by (score asc, id asc), filtered when a filter
    /// is supplied, using the configured strategy
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&dyn CandidateFilter>,
    ) -> AnnResult<Vec<SearchHit>> {
        self.search_with_strategy(query, k, filter, self.config.filter_strategy)
    }

    /// Same as `search` with an explicit strategy
    pub fn search_with_strategy(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&dyn CandidateFilter>,
        strategy: FilterStrategy,
    ) -> AnnResult<Vec<SearchHit>> {
        let reader = self.index.read();
        self.search_in(&reader, query, k, filter, strategy)
    }

    /// Configured-strategy search that also reports the index version the
    /// hits were computed against
    pub fn search_versioned(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&dyn CandidateFilter>,
    ) -> AnnResult<(u64, Vec<SearchHit>)> {
        let reader = self.index.read();
        let hits = self.search_in(&reader, query, k, filter, self.config.filter_strategy)?;
        Ok((reader.version(), hits))
    }

    fn search_in(
        &self,
        reader: &IndexReader<'_>,
        query: &[f32],
        k: usize,
        filter: Option<&dyn CandidateFilter>,
        strategy: FilterStrategy,
    ) -> AnnResult<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        match (filter, strategy) {
            (None, _) => self.top_k(reader, query, k, None),
            (Some(f), FilterStrategy::TopK) => self.top_k(reader, query, k, Some(f)),
            (Some(f), FilterStrategy::FillK) => self.fill_k(reader, query, k, f),
        }
    }

    fn top_k(
        &self,
        reader: &IndexReader<'_>,
        query: &[f32],
        k: usize,
        filter: Option<&dyn CandidateFilter>,
    ) -> AnnResult<Vec<SearchHit>> {
        let start = Instant::now();
        let ef = k
            .max(self.config.initial_ef)
            .max(self.index.config().hnsw.ef_search);

        let mut hits = reader.search(query, k, &SearchOptions::with_ef(ef))?;
        let candidates = hits.len();
        if let Some(f) = filter {
            hits.retain(|h| f.matches(h.id));
        }

        debug!(
            target: "strata::ann",
            k,
            ef,
            candidates,
            results = hits.len(),
            filtered = filter.is_some(),
            duration_us = start.elapsed().as_micros() as u64,
            "Top-k search completed"
        );
        Ok(hits)
    }

    fn fill_k(
        &self,
        reader: &IndexReader<'_>,
        query: &[f32],
        k: usize,
        filter: &dyn CandidateFilter,
    ) -> AnnResult<Vec<SearchHit>> {
        let start = Instant::now();
        let total = reader.len();

        let max_ef = self.config.max_ef.max(k);
        let mut ef = k.max(self.config.initial_ef).min(max_ef);
        let mut rounds = 0usize;

        let mut hits = loop {
            rounds += 1;
            let fetch = ef.min(total);
            let mut hits = reader.search(query, fetch, &SearchOptions::with_ef(ef))?;
            hits.retain(|h| filter.matches(h.id));

            if hits.len() >= k || fetch >= total {
                break hits;
            }
            if ef >= max_ef {
                warn!(
                    target: "strata::ann",
                    k,
                    max_ef,
                    found = hits.len(),
                    "Filtered search reached max_ef before filling k"
                );
                break hits;
            }
            ef = ef.saturating_mul(self.config.ef_growth).min(max_ef);
        };
        hits.truncate(k);

        debug!(
            target: "strata::ann",
            k,
            ef,
            rounds,
            results = hits.len(),
            duration_us = start.elapsed().as_micros() as u64,
            "Fill-k search completed"
        );
        Ok(hits)
    }
}
