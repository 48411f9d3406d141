//! ANN engine for strata-ann
//!
//! This crate owns everything below the query layer:
//! - VectorStore: per-index vector storage
//! - HnswGraph: the hierarchical proximity graph
//! - HnswIndex: RwLock-guarded store + graph, the unit of concurrency
//! - AnnSearcher: k-NN search composed with an opaque candidate filter
//!
//! The engine never sees attributes or predicates; filtering is expressed
//! through `CandidateFilter::matches(id)`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod vector;

pub use vector::{
    exact_search, for_metric, AnnSearcher, CancelFlag, CandidateFilter, DistanceFunction,
    GraphStats, HnswGraph, HnswIndex, IndexReader, IndexStats, LevelGenerator, SearchOptions,
    SplitMix64, VectorStore,
};
