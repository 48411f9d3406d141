//! Vector indexing primitives
//!
//! - **DistanceFunction**: Pluggable metric capability (Euclidean, Cosine, ...)
//! - **VectorStore**: Contiguous vector storage with slot reuse
//! - **LevelGenerator**: Injectable random layer assignment
//! - **HnswGraph**: Multi-layer proximity graph (insert, search, eager-repair delete)
//! - **HnswIndex**: Thread-safe index combining store and graph under one lock
//! - **AnnSearcher**: Filtered k-NN search over an index
//! - **exact_search**: Brute-force ground truth

pub mod brute_force;
pub mod distance;
pub mod hnsw;
pub mod index;
pub mod level;
pub mod searcher;
pub mod store;

pub use brute_force::{exact_search, exact_search_filtered};
pub use distance::{for_metric, Cosine, DistanceFunction, DotProduct, Euclidean, SquaredEuclidean};
pub use hnsw::{GraphStats, HnswGraph, Neighbor};
pub use index::{CancelFlag, HnswIndex, IndexReader, IndexStats, SearchOptions};
pub use level::{LevelGenerator, SplitMix64, MAX_LEVEL};
pub use searcher::{AnnSearcher, CandidateFilter};
pub use store::VectorStore;
