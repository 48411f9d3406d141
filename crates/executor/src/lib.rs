//! # strata-ann executor
//!
//! Filtered, paginated nearest-neighbor queries over HNSW indexes.
//!
//! - [`QueryEngine`] - Holds the repository, predicate evaluator and one
//!   ANN index per vector attribute
//! - [`QueryBuilder`] / [`Query`] - Build, validate and run queries
//! - [`Predicate`] - Attribute condition tree
//! - [`InMemoryRepository`] - Reference repository + attribute source
//!
//! ## Quick Start
//!
//! ```text
//! use strata_ann_executor::{InMemoryRepository, QueryEngine, Record};
//!
//! let repo = Arc::new(InMemoryRepository::new());
//! let engine = QueryEngine::with_attribute_filter(repo)
//!     .with_index("vector", searcher);
//!
//! let query = engine
//!     .query()
//!     .nearest_neighbors_f32("vector", &[7.7, 7.7], 8)
//!     .contains_string("name", "blue", false)
//!     .build()?;
//! let ids = query.find_ids()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod filter;
pub mod predicate;
pub mod query;
pub mod repository;

pub use filter::{AttributeFilter, FilterEvaluator};
pub use predicate::{NumOp, Number, Predicate, StringOp};
pub use query::{OrderBy, Query, QueryBuilder, QueryEngine};
pub use repository::{AttributeSource, AttributeValue, EntityRepository, InMemoryRepository, Record};
