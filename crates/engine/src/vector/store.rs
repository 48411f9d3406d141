//! VectorStore - Contiguous vector storage
//!
//! VectorStore owns the raw vector of every indexed entity and is the ground
//! truth for distance computation. Vectors are stored in a contiguous
//! `Vec<f32>` for cache-friendly access; a BTreeMap maps ids to offsets for
//! deterministic iteration.
//!
//! # Invariants
//!
//! - `id_to_offset` is the sole source of truth for stored vectors
//! - every stored vector has exactly `dimension` finite components
//! - storage slots are reused after removal; ids are assigned externally
//! - vectors are immutable once stored (an update is remove + insert)

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use strata_ann_core::{check_vector, AnnError, AnnResult, EntityId};

/// Per-index vector storage
pub struct VectorStore {
    /// Dimension D of every stored vector
    dimension: usize,

    /// Contiguous storage
    /// Layout: [v0_dim0, v0_dim1, ..., v0_dimN, v1_dim0, v1_dim1, ...]
    data: Vec<f32>,

    /// EntityId -> offset in data (in floats, not bytes)
    ///
    /// BTreeMap for deterministic iteration order.
    id_to_offset: BTreeMap<EntityId, usize>,

    /// Free list of removed storage slots
    free_slots: Vec<usize>,

    /// Bumped on every mutation; lets callers detect stale cached results
    version: AtomicU64,
}

impl VectorStore {
    /// Create an empty store for vectors of the given dimension
    pub fn new(dimension: usize) -> Self {
        VectorStore {
            dimension,
            data: Vec::new(),
            id_to_offset: BTreeMap::new(),
            free_slots: Vec::new(),
            version: AtomicU64::new(0),
        }
    }

    /// Get the dimension of vectors in this store
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Get the number of stored vectors
    pub fn len(&self) -> usize {
        self.id_to_offset.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.id_to_offset.is_empty()
    }

    /// Get current version
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    // ========================================================================
    // Write Operations
    // ========================================================================

    /// Store a new vector
    ///
    /// Reuses a free slot when one is available.
    ///
    /// # Errors
    ///
    /// - `InvalidEntityId` for id 0
    /// - `DuplicateEntity` if the id is already stored
    /// - `DimensionMismatch` / `InvalidVector` for malformed vectors
    pub fn insert(&mut self, id: EntityId, vector: &[f32]) -> AnnResult<()> {
        if !id.is_valid() {
            return Err(AnnError::InvalidEntityId { id });
        }
        check_vector(self.dimension, vector)?;
        if self.id_to_offset.contains_key(&id) {
            return Err(AnnError::DuplicateEntity { id });
        }

        let offset = if let Some(slot) = self.free_slots.pop() {
            self.data[slot..slot + self.dimension].copy_from_slice(vector);
            slot
        } else {
            let offset = self.data.len();
            self.data.extend_from_slice(vector);
            offset
        };
        self.id_to_offset.insert(id, offset);

        self.version.fetch_add(1, Ordering::Release);
        Ok(())
    }

    /// Remove a vector
    ///
    /// Returns true if the vector existed. The slot is zeroed and added to
    /// the free list.
    pub fn remove(&mut self, id: EntityId) -> bool {
        if let Some(offset) = self.id_to_offset.remove(&id) {
            self.data[offset..offset + self.dimension].fill(0.0);
            self.free_slots.push(offset);
            self.version.fetch_add(1, Ordering::Release);
            true
        } else {
            false
        }
    }

    /// Remove every vector
    pub fn clear(&mut self) {
        self.data.clear();
        self.id_to_offset.clear();
        self.free_slots.clear();
        self.version.fetch_add(1, Ordering::Release);
    }

    // ========================================================================
    // Read Operations
    // ========================================================================

    /// Get a vector by id
    pub fn get(&self, id: EntityId) -> Option<&[f32]> {
        let offset = *self.id_to_offset.get(&id)?;
        Some(&self.data[offset..offset + self.dimension])
    }

    /// Check if a vector exists
    pub fn contains(&self, id: EntityId) -> bool {
        self.id_to_offset.contains_key(&id)
    }

    /// Iterate all vectors in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &[f32])> {
        self.id_to_offset
            .iter()
            .map(|(&id, &offset)| (id, &self.data[offset..offset + self.dimension]))
    }

    /// All ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.id_to_offset.keys().copied()
    }

    /// Approximate heap bytes used by vector data and the id map
    pub fn memory_usage(&self) -> usize {
        self.data.capacity() * std::mem::size_of::<f32>()
            + self.id_to_offset.len()
                * (std::mem::size_of::<EntityId>() + std::mem::size_of::<usize>() + 16)
            + self.free_slots.capacity() * std::mem::size_of::<usize>()
    }
}
