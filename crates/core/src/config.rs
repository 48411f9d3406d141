//! Index configuration
//!
//! An index is configured once, at construction time, from an `IndexConfig`.
//! Configs can be built in code or loaded from a TOML file:
//!
//! ```toml
//! dimension = 128
//! metric = "euclidean"
//!
//! [hnsw]
//! m = 16
//! m0 = 32
//! ef_construction = 200
//! ef_search = 64
//! seed = 42
//!
//! [search]
//! filter_strategy = "top_k"
//! initial_ef = 64
//! max_ef = 4096
//! ef_growth = 2
//! ```

use crate::error::{AnnError, AnnResult};
use crate::types::DistanceMetric;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Maximum vector dimension accepted by an index
pub const MAX_VECTOR_DIM: usize = 8192;

/// HNSW graph parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HnswParams {
    /// Max connections per node on layers > 0 (default: 16)
    pub m: usize,
    /// Max connections per node on layer 0 (default: 2*M)
    pub m0: usize,
    /// Build-time beam width (default: 200)
    pub ef_construction: usize,
    /// Default search-time beam width (default: 64)
    pub ef_search: usize,
    /// Level multiplier; `None` means 1/ln(M)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ml: Option<f64>,
    /// Seed for the default level generator
    pub seed: u64,
}

impl Default for HnswParams {
    fn default() -> Self {
        let m = 16;
        Self {
            m,
            m0: m * 2,
            ef_construction: 200,
            ef_search: 64,
            ml: None,
            seed: 42,
        }
    }
}

impl HnswParams {
    /// Effective level multiplier (mL)
    pub fn level_multiplier(&self) -> f64 {
        self.ml.unwrap_or_else(|| 1.0 / (self.m as f64).ln())
    }

    /// Max connections for a given layer
    pub fn max_connections(&self, layer: usize) -> usize {
        if layer == 0 {
            self.m0
        } else {
            self.m
        }
    }
}

/// How an `AnnSearcher` combines a candidate filter with the ANN result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterStrategy {
    /// The ANN top-k defines the candidate universe; the filter keeps the
    /// subset of it that passes.
    #[default]
    TopK,
    /// Escalate the beam width until k candidates pass the filter, the graph
    /// is exhausted, or `max_ef` is reached.
    FillK,
}

/// Searcher parameters for filtered queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Filter composition strategy
    pub filter_strategy: FilterStrategy,
    /// Lower bound for the beam width of a filtered search
    pub initial_ef: usize,
    /// Upper bound for beam width escalation
    pub max_ef: usize,
    /// Beam width multiplier between escalation rounds
    pub ef_growth: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            filter_strategy: FilterStrategy::TopK,
            initial_ef: 64,
            max_ef: 4096,
            ef_growth: 2,
        }
    }
}

/// Index configuration - immutable after index creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Vector dimension D
    pub dimension: usize,
    /// Distance metric
    #[serde(default)]
    pub metric: DistanceMetric,
    /// Graph parameters
    #[serde(default)]
    pub hnsw: HnswParams,
    /// Filtered search parameters
    #[serde(default)]
    pub search: SearchConfig,
}

impl IndexConfig {
    /// Create a validated config with default graph and search parameters
    pub fn new(dimension: usize, metric: DistanceMetric) -> AnnResult<Self> {
        let config = IndexConfig {
            dimension,
            metric,
            hnsw: HnswParams::default(),
            search: SearchConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Replace the graph parameters
    pub fn with_hnsw(mut self, hnsw: HnswParams) -> Self {
        self.hnsw = hnsw;
        self
    }

    /// Replace the search parameters
    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    /// Replace the level generator seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.hnsw.seed = seed;
        self
    }

    /// Check every parameter
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> AnnResult<()> {
        if self.dimension == 0 || self.dimension > MAX_VECTOR_DIM {
            return Err(AnnError::invalid_config(format!(
                "dimension {} out of range 1..={}",
                self.dimension, MAX_VECTOR_DIM
            )));
        }
        let h = &self.hnsw;
        if h.m < 2 {
            return Err(AnnError::invalid_config(format!("m must be >= 2, got {}", h.m)));
        }
        if h.m0 < h.m {
            return Err(AnnError::invalid_config(format!(
                "m0 ({}) must be >= m ({})",
                h.m0, h.m
            )));
        }
        if h.ef_construction == 0 {
            return Err(AnnError::invalid_config("ef_construction must be > 0"));
        }
        if h.ef_search == 0 {
            return Err(AnnError::invalid_config("ef_search must be > 0"));
        }
        let ml = h.level_multiplier();
        if !ml.is_finite() || ml <= 0.0 {
            return Err(AnnError::invalid_config(format!(
                "ml must be finite and > 0, got {}",
                ml
            )));
        }
        let s = &self.search;
        if s.initial_ef == 0 {
            return Err(AnnError::invalid_config("initial_ef must be > 0"));
        }
        if s.max_ef < s.initial_ef {
            return Err(AnnError::invalid_config(format!(
                "max_ef ({}) must be >= initial_ef ({})",
                s.max_ef, s.initial_ef
            )));
        }
        if s.ef_growth < 2 {
            return Err(AnnError::invalid_config(format!(
                "ef_growth must be >= 2, got {}",
                s.ef_growth
            )));
        }
        Ok(())
    }

    /// Returns a commented default config file for the given dimension.
    pub fn default_toml() -> &'static str {
        r#"# strata-ann index configuration
#
# Vector dimension (required)
dimension = 128

# Distance metric: "euclidean" (default), "squared_euclidean", "cosine", "dot_product"
metric = "euclidean"

[hnsw]
# Max connections per node on upper layers, and on layer 0
m = 16
m0 = 32
# Beam width used while inserting
ef_construction = 200
# Default beam width used while searching
ef_search = 64
# Level multiplier, defaults to 1/ln(m)
# ml = 0.36
# Seed for level assignment (same seed + same inserts = same graph)
seed = 42

[search]
# "top_k": filter the ANN top-k (default)
# "fill_k": widen the search until k candidates pass the filter
filter_strategy = "top_k"
initial_ef = 64
max_ef = 4096
ef_growth = 2
"#
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> AnnResult<Self> {
        let config: IndexConfig = toml::from_str(content)
            .map_err(|e| AnnError::invalid_config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> AnnResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnnError::invalid_config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            AnnError::InvalidConfig { reason } => {
                AnnError::invalid_config(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> AnnResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| AnnError::invalid_config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            AnnError::invalid_config(format!(
                "failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
