//! Identifier and result types shared by every layer
//!
//! - `EntityId`: externally assigned, strictly positive entity identifier
//! - `DistanceMetric`: metric selector persisted in index configuration
//! - `SearchHit`: one ranked `(EntityId, score)` result

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Entity identifier
///
/// Assigned by the entity repository before indexing. Ids are strictly
/// positive; `0` is reserved and rejected by every index operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// The reserved, never-valid id
    pub const INVALID: EntityId = EntityId(0);

    /// Create a new EntityId
    pub fn new(id: u64) -> Self {
        EntityId(id)
    }

    /// Get the underlying u64 value
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// True for every id except the reserved `0`
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        EntityId(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

/// Distance metric used by an index
///
/// All metrics are expressed as distances: lower = more similar.
/// The computation itself lives in the engine (`DistanceFunction`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Euclidean (L2) distance: sqrt(sum((a - b)^2))
    /// Range: [0, inf)
    #[default]
    Euclidean,

    /// Squared Euclidean distance: sum((a - b)^2)
    /// Same ordering as Euclidean without the square root
    SquaredEuclidean,

    /// Cosine distance: 1 - cos(a, b)
    /// Range: [0, 2]; zero-norm vectors are treated as orthogonal
    Cosine,

    /// Negated inner product: -dot(a, b)
    /// Range: unbounded
    DotProduct,
}

impl DistanceMetric {
    /// Human-readable name for display
    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::SquaredEuclidean => "squared_euclidean",
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::DotProduct => "dot_product",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "euclidean" | "l2" => Some(DistanceMetric::Euclidean),
            "squared_euclidean" | "l2sq" | "l2_squared" => Some(DistanceMetric::SquaredEuclidean),
            "cosine" => Some(DistanceMetric::Cosine),
            "dot_product" | "dot" | "inner_product" | "ip" => Some(DistanceMetric::DotProduct),
            _ => None,
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ranked search result
///
/// `score` is the raw distance under the index metric, so lower is better.
/// Results ordered "by score" are sorted by (score asc, id asc).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Matching entity
    pub id: EntityId,
    /// Distance to the query vector
    pub score: f32,
}

impl SearchHit {
    /// Create a new SearchHit
    pub fn new(id: EntityId, score: f32) -> Self {
        SearchHit { id, score }
    }

    /// Canonical result ordering: score ascending, then id ascending
    pub fn cmp_by_score(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl From<(EntityId, f32)> for SearchHit {
    fn from((id, score): (EntityId, f32)) -> Self {
        SearchHit { id, score }
    }
}
