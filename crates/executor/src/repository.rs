//! Entity repositories
//!
//! The query layer only needs two things from the outside world: turning
//! result ids into entities (`EntityRepository`) and reading attribute
//! values for filtering (`AttributeSource`). `InMemoryRepository` provides
//! both for tests and embedded use.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use strata_ann_core::{AnnResult, EntityId};

/// Resolves entity ids into application entities
pub trait EntityRepository: Send + Sync {
    /// Entity type returned by materializing queries
    type Entity;

    /// Resolve ids in order; ids without an entity are skipped
    fn resolve(&self, ids: &[EntityId]) -> AnnResult<Vec<Self::Entity>>;

    /// Resolve ids in order, keeping one slot per id
    fn resolve_each(&self, ids: &[EntityId]) -> AnnResult<Vec<Option<Self::Entity>>> {
        ids.iter()
            .map(|id| Ok(self.resolve(std::slice::from_ref(id))?.into_iter().next()))
            .collect()
    }
}

/// Attribute value of a stored record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Integer value
    Int(i64),
    /// Floating-point value
    Float(f64),
    /// String value
    String(String),
}

impl AttributeValue {
    /// String content, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        AttributeValue::Int(v as i64)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

/// Read access to entity attributes
pub trait AttributeSource: Send + Sync {
    /// Value of `name` for entity `id`, if both exist
    fn attribute(&self, id: EntityId, name: &str) -> Option<AttributeValue>;
}

/// A stored entity: id plus named attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Entity id
    pub id: EntityId,
    /// Named attribute values
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Record {
    /// Record with no attributes
    pub fn new(id: EntityId) -> Self {
        Record {
            id,
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Attribute value by name
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}

/// Thread-safe in-memory record store
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    records: RwLock<BTreeMap<EntityId, Record>>,
}

impl InMemoryRepository {
    /// Empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record; returns the previous one
    pub fn put(&self, record: Record) -> Option<Record> {
        self.records.write().insert(record.id, record)
    }

    /// Remove a record
    pub fn remove(&self, id: EntityId) -> Option<Record> {
        self.records.write().remove(&id)
    }

    /// Copy of a record
    pub fn get(&self, id: EntityId) -> Option<Record> {
        self.records.read().get(&id).cloned()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl EntityRepository for InMemoryRepository {
    type Entity = Record;

    fn resolve(&self, ids: &[EntityId]) -> AnnResult<Vec<Record>> {
        let records = self.records.read();
        Ok(ids.iter().filter_map(|id| records.get(id).cloned()).collect())
    }

    fn resolve_each(&self, ids: &[EntityId]) -> AnnResult<Vec<Option<Record>>> {
        let records = self.records.read();
        Ok(ids.iter().map(|id| records.get(id).cloned()).collect())
    }
}

impl AttributeSource for InMemoryRepository {
    fn attribute(&self, id: EntityId, name: &str) -> Option<AttributeValue> {
        self.records.read().get(&id)?.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> EntityId {
        EntityId::new(n)
    }

    #[test]
    fn test_resolve_preserves_order_and_skips_missing() {
        let repo = InMemoryRepository::new();
        repo.put(Record::new(id(1)).with("name", "one"));
        repo.put(Record::new(id(2)).with("name", "two"));

        let resolved = repo.resolve(&[id(2), id(9), id(1)]).unwrap();
        let ids: Vec<EntityId> = resolved.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![id(2), id(1)]);

        let each = repo.resolve_each(&[id(2), id(9)]).unwrap();
        assert!(each[0].is_some());
        assert!(each[1].is_none());
    }

    #[test]
    fn test_attribute_source() {
        let repo = InMemoryRepository::new();
        repo.put(Record::new(id(1)).with("name", "Red").with("year", 2020));
        assert_eq!(
            repo.attribute(id(1), "name"),
            Some(AttributeValue::String("Red".into()))
        );
        assert_eq!(repo.attribute(id(1), "year"), Some(AttributeValue::Int(2020)));
        assert_eq!(repo.attribute(id(1), "missing"), None);
        assert_eq!(repo.attribute(id(2), "name"), None);
    }

    #[test]
    fn test_put_replaces_and_remove() {
        let repo = InMemoryRepository::new();
        assert!(repo.put(Record::new(id(1)).with("v", 1)).is_none());
        let old = repo.put(Record::new(id(1)).with("v", 2)).unwrap();
        assert_eq!(old.get("v"), Some(&AttributeValue::Int(1)));
        assert_eq!(repo.len(), 1);
        assert!(repo.remove(id(1)).is_some());
        assert!(repo.is_empty());
    }

    struct Slow;

    impl EntityRepository for Slow {
        type Entity = u64;

        fn resolve(&self, ids: &[EntityId]) -> AnnResult<Vec<u64>> {
            Ok(ids.iter().map(|i| i.as_u64()).filter(|n| n % 2 == 1).collect())
        }
    }

    #[test]
    fn test_default_resolve_each() {
        let each = Slow.resolve_each(&[id(1), id(2), id(3)]).unwrap();
        assert_eq!(each, vec![Some(1), None, Some(3)]);
    }
}
