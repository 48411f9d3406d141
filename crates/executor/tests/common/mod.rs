//! Shared fixtures for executor integration tests

#![allow(dead_code)]

use std::sync::Arc;

use strata_ann_core::{DistanceMetric, EntityId, IndexConfig};
use strata_ann_engine::{AnnSearcher, HnswIndex};
use strata_ann_executor::{InMemoryRepository, QueryEngine, Record};

/// Repository, index and engine wired together, with ids assigned from 1
pub struct Fixture {
    pub repo: Arc<InMemoryRepository>,
    pub index: Arc<HnswIndex>,
    pub engine: QueryEngine<InMemoryRepository>,
    next_id: u64,
}

impl Fixture {
    pub fn new(dimension: usize) -> Self {
        let config = IndexConfig::new(dimension, DistanceMetric::Euclidean).unwrap();
        let index = Arc::new(HnswIndex::new(config).unwrap());
        let repo = Arc::new(InMemoryRepository::new());
        let engine = QueryEngine::with_attribute_filter(Arc::clone(&repo))
            .with_index("vector", Arc::new(AnnSearcher::new(Arc::clone(&index))));
        Fixture {
            repo,
            index,
            engine,
            next_id: 1,
        }
    }

    /// Store a named entity with its vector; returns the assigned id
    pub fn put(&mut self, name: &str, vector: &[f32]) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        self.repo.put(Record::new(id).with("name", name));
        self.index.insert(id, vector).unwrap();
        id
    }
}

/// The nine-point diagonal dataset: ids 1..=9 at (i, i)
pub fn diagonal() -> Fixture {
    let mut fx = Fixture::new(2);
    for (i, name) in [
        "Power of red",
        "Blueberry",
        "Red",
        "Blue sea",
        "Lightblue",
        "Red apple",
        "Hundred",
        "Tired",
        "Power of blue",
    ]
    .iter()
    .enumerate()
    {
        let v = (i + 1) as f32;
        fx.put(name, &[v, v]);
    }
    fx
}

pub fn name_of(record: &Record) -> &str {
    record
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
}

pub fn ids(raw: &[u64]) -> Vec<EntityId> {
    raw.iter().copied().map(EntityId::new).collect()
}
