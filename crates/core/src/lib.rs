//! Core types for strata-ann
//!
//! This crate defines the foundational types used throughout the system:
//! - EntityId: Externally assigned identifier of an indexed entity
//! - DistanceMetric: Metric selector (distance semantics, lower = closer)
//! - SearchHit: Ranked `(EntityId, score)` search result
//! - AnnError: Error type hierarchy
//! - IndexConfig: Index construction parameters (TOML loadable)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod types;

pub use config::{FilterStrategy, HnswParams, IndexConfig, SearchConfig, MAX_VECTOR_DIM};
pub use error::{check_vector, AnnError, AnnResult};
pub use types::{DistanceMetric, EntityId, SearchHit};
