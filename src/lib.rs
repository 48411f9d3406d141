//! strata-ann - Embedded approximate nearest-neighbor search
//!
//! An HNSW index over externally identified vectors, plus a query layer that
//! combines one nearest-neighbor condition with attribute predicates,
//! offset and limit.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use strata_ann::{AnnSearcher, DistanceMetric, EntityId, HnswIndex, IndexConfig,
//!                  InMemoryRepository, QueryEngine, Record};
//!
//! let index = Arc::new(HnswIndex::new(IndexConfig::new(2, DistanceMetric::Euclidean)?)?);
//! let repo = Arc::new(InMemoryRepository::new());
//!
//! repo.put(Record::new(EntityId::new(1)).with("name", "Red apple"));
//! index.insert(EntityId::new(1), &[6.0, 6.0])?;
//!
//! let engine = QueryEngine::with_attribute_filter(repo)
//!     .with_index("vector", Arc::new(AnnSearcher::new(index)));
//! let query = engine
//!     .query()
//!     .nearest_neighbors_f32("vector", &[4.1, 4.2], 6)
//!     .contains_string("name", "red", false)
//!     .build()?;
//! let results = query.find_with_scores()?;
//! ```
//!
//! # Architecture
//!
//! - `strata-ann-core`: ids, metrics, config and errors
//! - `strata-ann-engine`: vector storage, the HNSW graph and the searcher
//! - `strata-ann-executor`: predicates, repositories and queries

// Re-export the public API from strata-ann-executor
pub use strata_ann_executor::*;

pub use strata_ann_core::{
    AnnError, AnnResult, DistanceMetric, EntityId, FilterStrategy, HnswParams, IndexConfig,
    SearchConfig, SearchHit,
};
pub use strata_ann_engine::{
    AnnSearcher, CancelFlag, CandidateFilter, DistanceFunction, HnswIndex, IndexStats,
    LevelGenerator, SearchOptions,
};
