//! HnswIndex - thread-safe ANN index
//!
//! One index owns one `VectorStore` and one `HnswGraph` behind a single
//! `parking_lot::RwLock`. Writers hold the write lock for the whole
//! operation, so a node is either fully linked or invisible to readers.
//! Readers share the lock and never block each other.
//!
//! Every write validates its input before touching the index; a failed call
//! leaves the index unchanged.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{RwLock, RwLockReadGuard};
use strata_ann_core::{
    check_vector, AnnError, AnnResult, DistanceMetric, EntityId, IndexConfig, SearchHit,
};
use tracing::{debug, info};

use crate::vector::brute_force::{exact_search, exact_search_filtered};
use crate::vector::distance::{self, DistanceFunction};
use crate::vector::hnsw::{GraphStats, HnswGraph};
use crate::vector::level::LevelGenerator;
use crate::vector::store::VectorStore;

/// Cooperative cancellation flag
///
/// Clones share the same flag. A search polls it between expansions and
/// returns `AnnError::Cancelled` once it is set.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Check whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear the flag so it can be reused
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Per-call search options
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Beam width; `None` uses the configured `ef_search`
    pub ef: Option<usize>,
    /// Optional cancellation flag
    pub cancel: Option<CancelFlag>,
}

impl SearchOptions {
    /// Options with an explicit beam width
    pub fn with_ef(ef: usize) -> Self {
        SearchOptions {
            ef: Some(ef),
            cancel: None,
        }
    }
}

/// Snapshot of index statistics
#[derive(Debug, Clone, PartialEq)]
pub struct IndexStats {
    /// Number of indexed entities
    pub len: usize,
    /// Vector dimension
    pub dimension: usize,
    /// Distance function name
    pub metric: &'static str,
    /// Graph structure counts
    pub graph: GraphStats,
    /// Approximate heap bytes (vectors + graph)
    pub memory_bytes: usize,
    /// Mutation counter
    pub version: u64,
}

struct IndexState {
    store: VectorStore,
    graph: HnswGraph,
}

/// Thread-safe HNSW index over externally identified vectors
pub struct HnswIndex {
    config: IndexConfig,
    distance: Arc<dyn DistanceFunction>,
    state: RwLock<IndexState>,
}

impl HnswIndex {
    /// Create an empty index using the configured metric
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the config fails validation.
    pub fn new(config: IndexConfig) -> AnnResult<Self> {
        let distance = distance::for_metric(config.metric);
        Self::with_distance(config, distance)
    }

    /// Create an empty index with a custom distance function
    ///
    /// `config.metric` is kept for reporting only.
    pub fn with_distance(config: IndexConfig, distance: Arc<dyn DistanceFunction>) -> AnnResult<Self> {
        let levels = LevelGenerator::seeded(config.hnsw.seed, config.hnsw.level_multiplier());
        Self::build(config, distance, levels)
    }

    /// Create an empty index drawing node levels from `levels`
    pub fn with_level_generator(config: IndexConfig, levels: LevelGenerator) -> AnnResult<Self> {
        let distance = distance::for_metric(config.metric);
        Self::build(config, distance, levels)
    }

    fn build(
        config: IndexConfig,
        distance: Arc<dyn DistanceFunction>,
        levels: LevelGenerator,
    ) -> AnnResult<Self> {
        config.validate()?;
        let graph = HnswGraph::with_level_generator(config.hnsw.clone(), distance.clone(), levels);
        let store = VectorStore::new(config.dimension);

        info!(
            target: "strata::ann",
            dimension = config.dimension,
            metric = distance.name(),
            m = config.hnsw.m,
            m0 = config.hnsw.m0,
            ef_construction = config.hnsw.ef_construction,
            "Created HNSW index"
        );

        Ok(HnswIndex {
            config,
            distance,
            state: RwLock::new(IndexState { store, graph }),
        })
    }

    /// Index configuration
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Vector dimension
    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    /// Configured metric
    pub fn metric(&self) -> DistanceMetric {
        self.config.metric
    }

    // ========================================================================
    // Write Operations
    // ========================================================================

    /// Insert a vector under `id`
    ///
    /// # Errors
    ///
    /// `InvalidEntityId`, `DuplicateEntity`, `DimensionMismatch` or
    /// `InvalidVector`; the index is unchanged on error.
    pub fn insert(&self, id: EntityId, vector: &[f32]) -> AnnResult<()> {
        let start = Instant::now();
        let mut state = self.state.write();
        Self::insert_locked(&mut state, id, vector)?;

        debug!(
            target: "strata::ann",
            id = id.as_u64(),
            len = state.store.len(),
            duration_us = start.elapsed().as_micros() as u64,
            "Inserted vector"
        );
        Ok(())
    }

    fn insert_locked(state: &mut IndexState, id: EntityId, vector: &[f32]) -> AnnResult<()> {
        state.store.insert(id, vector)?;
        if let Err(e) = state.graph.insert(id, &state.store) {
            state.store.remove(id);
            return Err(e);
        }
        Ok(())
    }

    /// Insert many vectors under one write lock
    ///
    /// The whole batch is validated first (ids, duplicates inside the batch
    /// and against the index, dimensions, finiteness); nothing is inserted
    /// unless every item is valid. Returns the number inserted.
    pub fn insert_batch(&self, items: &[(EntityId, Vec<f32>)]) -> AnnResult<usize> {
        let start = Instant::now();
        let mut state = self.state.write();

        let mut seen = std::collections::BTreeSet::new();
        for (id, vector) in items {
            if !id.is_valid() {
                return Err(AnnError::InvalidEntityId { id: *id });
            }
            if !seen.insert(*id) || state.store.contains(*id) {
                return Err(AnnError::DuplicateEntity { id: *id });
            }
            check_vector(self.config.dimension, vector)?;
        }

        for (id, vector) in items {
            Self::insert_locked(&mut state, *id, vector)?;
        }

        debug!(
            target: "strata::ann",
            count = items.len(),
            len = state.store.len(),
            duration_us = start.elapsed().as_micros() as u64,
            "Inserted vector batch"
        );
        Ok(items.len())
    }

    /// Remove the vector stored under `id`
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if `id` is not indexed.
    pub fn delete(&self, id: EntityId) -> AnnResult<()> {
        let start = Instant::now();
        let mut state = self.state.write();
        if !state.store.contains(id) {
            return Err(AnnError::EntityNotFound { id });
        }

        let IndexState { store, graph } = &mut *state;
        graph.remove(id, store);
        store.remove(id);

        debug!(
            target: "strata::ann",
            id = id.as_u64(),
            len = store.len(),
            duration_us = start.elapsed().as_micros() as u64,
            "Deleted vector"
        );
        Ok(())
    }

    /// Replace the vector stored under `id` (delete + reinsert)
    ///
    /// # Errors
    ///
    /// `EntityNotFound`, `DimensionMismatch` or `InvalidVector`; the old
    /// vector is kept on error.
    pub fn update(&self, id: EntityId, vector: &[f32]) -> AnnResult<()> {
        check_vector(self.config.dimension, vector)?;
        let mut state = self.state.write();
        if !state.store.contains(id) {
            return Err(AnnError::EntityNotFound { id });
        }

        {
            let IndexState { store, graph } = &mut *state;
            graph.remove(id, store);
            store.remove(id);
        }
        Self::insert_locked(&mut state, id, vector)?;

        debug!(target: "strata::ann", id = id.as_u64(), "Updated vector");
        Ok(())
    }

    /// Remove every vector
    pub fn clear(&self) {
        let mut state = self.state.write();
        let removed = state.store.len();
        state.graph.clear();
        state.store.clear();
        info!(target: "strata::ann", removed, "Cleared HNSW index");
    }

    // ========================================================================
    // Read Operations
    // ========================================================================

    /// Take a consistent read view of the index
    ///
    /// Every call on the returned reader sees the same index state; writers
    /// wait until it is dropped.
    pub fn read(&self) -> IndexReader<'_> {
        IndexReader {
            index: self,
            state: self.state.read(),
        }
    }

    /// Approximate k nearest neighbors with the configured `ef_search`
    pub fn search(&self, query: &[f32], k: usize) -> AnnResult<Vec<SearchHit>> {
        self.read().search(query, k, &SearchOptions::default())
    }

    /// Approximate k nearest neighbors with explicit options
    pub fn search_with(
        &self,
        query: &[f32],
        k: usize,
        options: &SearchOptions,
    ) -> AnnResult<Vec<SearchHit>> {
        self.read().search(query, k, options)
    }

    /// Exact k nearest neighbors (brute force)
    pub fn search_exact(&self, query: &[f32], k: usize) -> AnnResult<Vec<SearchHit>> {
        self.read().search_exact(query, k)
    }

    /// Copy of the vector stored under `id`
    pub fn get(&self, id: EntityId) -> Option<Vec<f32>> {
        self.state.read().store.get(id).map(<[f32]>::to_vec)
    }

    /// Check if `id` is indexed
    pub fn contains(&self, id: EntityId) -> bool {
        self.state.read().store.contains(id)
    }

    /// Number of indexed vectors
    pub fn len(&self) -> usize {
        self.state.read().store.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.state.read().store.is_empty()
    }

    /// Mutation counter; changes whenever the indexed set changes
    pub fn version(&self) -> u64 {
        self.state.read().store.version()
    }

    /// Structural statistics
    pub fn stats(&self) -> IndexStats {
        let state = self.state.read();
        IndexStats {
            len: state.store.len(),
            dimension: self.config.dimension,
            metric: self.distance.name(),
            graph: state.graph.stats(),
            memory_bytes: state.store.memory_usage() + state.graph.memory_usage(),
            version: state.store.version(),
        }
    }

    /// Check graph invariants and store/graph agreement
    ///
    /// # Errors
    ///
    /// Returns `IndexCorruption` describing the first violation.
    pub fn validate(&self) -> AnnResult<()> {
        let state = self.state.read();
        state.graph.validate()?;
        if state.graph.len() != state.store.len() {
            return Err(AnnError::corruption(format!(
                "graph has {} nodes but store has {} vectors",
                state.graph.len(),
                state.store.len()
            )));
        }
        if let Some(id) = state.store.ids().find(|id| !state.graph.contains(*id)) {
            return Err(AnnError::corruption(format!("{} is stored but not linked", id)));
        }
        Ok(())
    }

    /// Number of nodes reachable from the entry point on `layer`
    pub fn reachable_at(&self, layer: usize) -> usize {
        self.state.read().graph.reachable_at(layer)
    }
}

impl std::fmt::Debug for HnswIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HnswIndex")
            .field("dimension", &self.config.dimension)
            .field("metric", &self.distance.name())
            .field("len", &self.len())
            .finish()
    }
}

/// Read view over an `HnswIndex`
///
/// Holds the read lock for its lifetime.
pub struct IndexReader<'a> {
    index: &'a HnswIndex,
    state: RwLockReadGuard<'a, IndexState>,
}

impl IndexReader<'_> {
    /// Number of indexed vectors
    pub fn len(&self) -> usize {
        self.state.store.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.state.store.is_empty()
    }

    /// Mutation counter at the time the view was taken
    pub fn version(&self) -> u64 {
        self.state.store.version()
    }

    /// Approximate k nearest neighbors
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` / `InvalidVector` for a malformed query,
    /// `Cancelled` if the cancel flag is set during the search.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        options: &SearchOptions,
    ) -> AnnResult<Vec<SearchHit>> {
        let start = Instant::now();
        check_vector(self.index.config.dimension, query)?;

        let ef = options.ef.unwrap_or(self.index.config.hnsw.ef_search).max(k);
        let hits = self.state.graph.search(
            query,
            k,
            ef,
            &self.state.store,
            options.cancel.as_ref(),
        )?;

        debug!(
            target: "strata::ann",
            k,
            ef,
            results = hits.len(),
            duration_us = start.elapsed().as_micros() as u64,
            "ANN search completed"
        );
        Ok(hits)
    }

    /// Exact k nearest neighbors (brute force)
    pub fn search_exact(&self, query: &[f32], k: usize) -> AnnResult<Vec<SearchHit>> {
        check_vector(self.index.config.dimension, query)?;
        Ok(exact_search(
            &self.state.store,
            self.index.distance.as_ref(),
            query,
            k,
        ))
    }

    /// Exact k nearest neighbors among the ids accepted by `keep`
    pub fn search_exact_filtered<F>(&self, query: &[f32], k: usize, keep: F) -> AnnResult<Vec<SearchHit>>
    where
        F: Fn(EntityId) -> bool,
    {
        check_vector(self.index.config.dimension, query)?;
        Ok(exact_search_filtered(
            &self.state.store,
            self.index.distance.as_ref(),
            query,
            k,
            keep,
        ))
    }
}
