//! HNSW (Hierarchical Navigable Small World) graph
//!
//! O(log n) approximate nearest neighbor search built from scratch.
//!
//! ## Design
//! - Incremental inserts (no rebuild required)
//! - Incremental deletes with eager neighbor repair
//! - Deterministic results (seeded level generator, BTreeMap node table,
//!   neighbor lists sorted by (distance asc, id asc))
//! - Graph only: vectors live in the `VectorStore` and are passed in
//!
//! ## Algorithm
//!
//! HNSW builds a multi-layer graph where:
//! - Layer 0 contains all nodes with up to M0 connections each
//! - Higher layers contain a subset of nodes with up to M connections each
//! - Search starts from the top layer and greedily descends to layer 0
//! - At each layer, a beam search finds the ef closest neighbors
//!
//! ## Ordering
//!
//! Distances follow the configured metric: lower = closer. Every ranked
//! list is ordered by (distance asc, EntityId asc).

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap, VecDeque};
use std::sync::Arc;

use rustc_hash::FxHashSet;
use smallvec::{smallvec, SmallVec};
use strata_ann_core::{AnnError, AnnResult, EntityId, HnswParams, SearchHit};
use tracing::warn;

use crate::vector::distance::DistanceFunction;
use crate::vector::index::CancelFlag;
use crate::vector::level::LevelGenerator;
use crate::vector::store::VectorStore;

/// An outgoing edge with its cached distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Target node
    pub id: EntityId,
    /// Distance between the owning node and the target
    pub distance: f32,
}

impl Neighbor {
    fn order(&self, other: &Neighbor) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// A node in the HNSW graph
#[derive(Debug, Clone)]
struct GraphNode {
    /// Max layer this node appears in
    max_layer: usize,
    /// Neighbors per layer: neighbors[layer] sorted by (distance, id)
    neighbors: SmallVec<[Vec<Neighbor>; 2]>,
}

impl GraphNode {
    fn layer(&self, layer: usize) -> &[Neighbor] {
        self.neighbors.get(layer).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Search candidate ordered by (distance asc, id asc)
///
/// `BinaryHeap<Candidate>` is a max-heap with the worst candidate on top;
/// `BinaryHeap<Reverse<Candidate>>` pops the nearest first.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    distance: f32,
    id: EntityId,
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl From<Candidate> for Neighbor {
    fn from(c: Candidate) -> Self {
        Neighbor {
            id: c.id,
            distance: c.distance,
        }
    }
}

/// Structural statistics of a graph
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GraphStats {
    /// Number of nodes
    pub node_count: usize,
    /// Highest layer in the graph
    pub max_level: usize,
    /// nodes_per_layer[l] = number of nodes present on layer l
    pub nodes_per_layer: Vec<usize>,
    /// Total number of directed edges across all layers
    pub edge_count: usize,
    /// Current entry point
    pub entry_point: Option<EntityId>,
}

/// Graph-only HNSW structure. Does NOT own vectors.
///
/// All search and graph-building methods accept the `VectorStore` holding
/// the vectors of every node.
pub struct HnswGraph {
    params: HnswParams,
    distance: Arc<dyn DistanceFunction>,
    /// Graph structure: EntityId -> GraphNode
    /// BTreeMap for deterministic iteration
    nodes: BTreeMap<EntityId, GraphNode>,
    /// Entry point (a node on the top layer)
    entry_point: Option<EntityId>,
    /// Current max level in graph
    max_level: usize,
    levels: LevelGenerator,
}

impl HnswGraph {
    /// Create an empty graph with the default seeded level generator
    pub fn new(params: HnswParams, distance: Arc<dyn DistanceFunction>) -> Self {
        let levels = LevelGenerator::seeded(params.seed, params.level_multiplier());
        Self::with_level_generator(params, distance, levels)
    }

    /// Create an empty graph drawing levels from `levels`
    pub fn with_level_generator(
        params: HnswParams,
        distance: Arc<dyn DistanceFunction>,
        levels: LevelGenerator,
    ) -> Self {
        HnswGraph {
            params,
            distance,
            nodes: BTreeMap::new(),
            entry_point: None,
            max_level: 0,
            levels,
        }
    }

    /// Graph parameters
    pub fn params(&self) -> &HnswParams {
        &self.params
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check if a node exists
    pub fn contains(&self, id: EntityId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Current entry point
    pub fn entry_point(&self) -> Option<EntityId> {
        self.entry_point
    }

    /// Highest layer in the graph
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    /// Top layer of a node
    pub fn node_level(&self, id: EntityId) -> Option<usize> {
        self.nodes.get(&id).map(|n| n.max_layer)
    }

    /// Neighbor list of a node at a layer
    pub fn neighbors(&self, id: EntityId, layer: usize) -> Option<&[Neighbor]> {
        let node = self.nodes.get(&id)?;
        node.neighbors.get(layer).map(Vec::as_slice)
    }

    /// Drop every node. The level generator keeps its stream position.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.entry_point = None;
        self.max_level = 0;
    }

    // ========================================================================
    // Internal: Graph Operations
    // ========================================================================

    fn distance_to(&self, query: &[f32], id: EntityId, store: &VectorStore) -> Option<f32> {
        store.get(id).map(|v| self.distance.distance(query, v))
    }

    /// Beam search at a single layer
    ///
    /// Returns up to `ef` closest nodes sorted by (distance asc, id asc).
    /// The frontier is a min-heap (nearest popped first); the result set is
    /// a max-heap with the worst kept result on top for O(1) eviction.
    fn search_layer(
        &self,
        query: &[f32],
        entry_points: &[Candidate],
        ef: usize,
        layer: usize,
        store: &VectorStore,
        cancel: Option<&CancelFlag>,
    ) -> AnnResult<Vec<Candidate>> {
        let mut visited: FxHashSet<EntityId> = FxHashSet::default();
        let mut frontier: BinaryHeap<Reverse<Candidate>> = BinaryHeap::new();
        let mut results: BinaryHeap<Candidate> = BinaryHeap::new();

        for &ep in entry_points {
            if visited.insert(ep.id) {
                frontier.push(Reverse(ep));
                results.push(ep);
            }
        }
        while results.len() > ef {
            results.pop();
        }

        while let Some(Reverse(nearest)) = frontier.pop() {
            if let Some(flag) = cancel {
                if flag.is_cancelled() {
                    return Err(AnnError::Cancelled);
                }
            }

            // Stop once the nearest frontier entry is worse than the worst result
            if results.len() >= ef {
                if let Some(worst) = results.peek() {
                    if nearest > *worst {
                        break;
                    }
                }
            }

            let node = match self.nodes.get(&nearest.id) {
                Some(node) => node,
                None => {
                    warn!(target: "strata::ann", id = nearest.id.as_u64(), layer, "Skipping missing node during search");
                    continue;
                }
            };

            for neighbor in node.layer(layer) {
                if !visited.insert(neighbor.id) {
                    continue;
                }
                let distance = match self.distance_to(query, neighbor.id, store) {
                    Some(d) => d,
                    None => {
                        warn!(target: "strata::ann", id = neighbor.id.as_u64(), layer, "Skipping neighbor without stored vector");
                        continue;
                    }
                };
                let candidate = Candidate {
                    distance,
                    id: neighbor.id,
                };

                let admit = results.len() < ef || results.peek().map_or(true, |w| candidate < *w);
                if admit {
                    frontier.push(Reverse(candidate));
                    results.push(candidate);
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        Ok(results.into_sorted_vec())
    }

    /// Greedy 1-NN descent from `from_layer` down to `to_layer`
    ///
    /// At each layer, evaluates ALL neighbors and moves to the best one
    /// until no neighbor improves.
    fn greedy_descend(
        &self,
        query: &[f32],
        entry: Candidate,
        from_layer: usize,
        to_layer: usize,
        store: &VectorStore,
    ) -> Candidate {
        let mut current = entry;

        for layer in (to_layer..=from_layer).rev() {
            loop {
                let mut best = current;
                if let Some(node) = self.nodes.get(&current.id) {
                    for neighbor in node.layer(layer) {
                        if let Some(distance) = self.distance_to(query, neighbor.id, store) {
                            let candidate = Candidate {
                                distance,
                                id: neighbor.id,
                            };
                            if candidate < best {
                                best = candidate;
                            }
                        }
                    }
                }
                if best.id == current.id {
                    break;
                }
                current = best;
            }
        }

        current
    }

    /// Diversity heuristic neighbor selection
    ///
    /// `candidates` must be sorted by distance to the base node. A candidate
    /// is kept only if it is closer to the base than to every neighbor kept
    /// so far. Free slots are then back-filled with the nearest discarded
    /// candidates so sparse regions stay connected.
    fn select_neighbors(
        &self,
        candidates: &[Candidate],
        max_connections: usize,
        store: &VectorStore,
    ) -> Vec<Neighbor> {
        let mut selected: Vec<Candidate> = Vec::with_capacity(max_connections);
        let mut discarded: Vec<Candidate> = Vec::new();

        for &candidate in candidates {
            if selected.len() >= max_connections {
                break;
            }
            let vector = match store.get(candidate.id) {
                Some(v) => v,
                None => continue,
            };
            let diverse = selected.iter().all(|kept| {
                self.distance_to(vector, kept.id, store)
                    .map_or(true, |d| candidate.distance < d)
            });
            if diverse {
                selected.push(candidate);
            } else {
                discarded.push(candidate);
            }
        }

        for candidate in discarded {
            if selected.len() >= max_connections {
                break;
            }
            selected.push(candidate);
        }

        selected.sort();
        selected.into_iter().map(Neighbor::from).collect()
    }

    /// Add the edge `from -> to` at `layer`, re-pruning `from` if it
    /// overflows its capacity
    fn link(&mut self, from: EntityId, to: EntityId, distance: f32, layer: usize, store: &VectorStore) {
        let capacity = self.params.max_connections(layer);
        let edge = Neighbor { id: to, distance };

        let overflow = match self.nodes.get_mut(&from) {
            Some(node) if layer <= node.max_layer => {
                let list = &mut node.neighbors[layer];
                if !list.iter().any(|n| n.id == to) {
                    let pos = list.partition_point(|n| n.order(&edge) == Ordering::Less);
                    list.insert(pos, edge);
                }
                list.len() > capacity
            }
            _ => {
                warn!(target: "strata::ann", from = from.as_u64(), to = to.as_u64(), layer, "Skipping link from missing node");
                false
            }
        };

        if overflow {
            self.prune(from, layer, store);
        }
    }

    /// Re-select a node's neighbor list at `layer` with the heuristic
    fn prune(&mut self, id: EntityId, layer: usize, store: &VectorStore) {
        let capacity = self.params.max_connections(layer);
        let candidates: Vec<Candidate> = match self.nodes.get(&id) {
            Some(node) => node
                .layer(layer)
                .iter()
                .map(|n| Candidate {
                    distance: n.distance,
                    id: n.id,
                })
                .collect(),
            None => return,
        };

        let kept = self.select_neighbors(&candidates, capacity, store);
        if let Some(node) = self.nodes.get_mut(&id) {
            if layer <= node.max_layer {
                node.neighbors[layer] = kept;
            }
        }
    }

    // ========================================================================
    // Graph Building
    // ========================================================================

    /// Link a stored vector into the graph
    ///
    /// The vector for `id` must already be in `store`.
    ///
    /// # Errors
    ///
    /// - `DuplicateEntity` if the node exists
    /// - `IndexCorruption` if the vector or the entry point is missing
    pub fn insert(&mut self, id: EntityId, store: &VectorStore) -> AnnResult<()> {
        if self.nodes.contains_key(&id) {
            return Err(AnnError::DuplicateEntity { id });
        }
        let vector = store
            .get(id)
            .ok_or_else(|| AnnError::corruption(format!("no stored vector for {}", id)))?;

        let level = self.levels.next_level();

        let entry_id = match self.entry_point {
            Some(ep) => ep,
            None => {
                self.nodes.insert(
                    id,
                    GraphNode {
                        max_layer: level,
                        neighbors: smallvec![Vec::new(); level + 1],
                    },
                );
                self.entry_point = Some(id);
                self.max_level = level;
                return Ok(());
            }
        };

        let entry_distance = self.distance_to(vector, entry_id, store).ok_or_else(|| {
            AnnError::corruption(format!("entry point {} has no stored vector", entry_id))
        })?;
        let mut current = Candidate {
            distance: entry_distance,
            id: entry_id,
        };
        if self.max_level > level {
            current = self.greedy_descend(vector, current, self.max_level, level + 1, store);
        }

        // Select neighbors on every shared layer before the node becomes visible
        let top = level.min(self.max_level);
        let mut layers: SmallVec<[Vec<Neighbor>; 2]> = smallvec![Vec::new(); level + 1];
        let mut entry_points = vec![current];
        for layer in (0..=top).rev() {
            let candidates = self.search_layer(
                vector,
                &entry_points,
                self.params.ef_construction,
                layer,
                store,
                None,
            )?;
            layers[layer] =
                self.select_neighbors(&candidates, self.params.max_connections(layer), store);
            if !candidates.is_empty() {
                entry_points = candidates;
            }
        }

        let reverse: Vec<(usize, Neighbor)> = layers
            .iter()
            .enumerate()
            .flat_map(|(layer, list)| list.iter().map(move |&n| (layer, n)))
            .collect();
        self.nodes.insert(
            id,
            GraphNode {
                max_layer: level,
                neighbors: layers,
            },
        );
        for (layer, neighbor) in reverse {
            self.link(neighbor.id, id, neighbor.distance, layer, store);
        }

        if level > self.max_level {
            self.entry_point = Some(id);
            self.max_level = level;
        }
        Ok(())
    }

    /// Remove a node and repair the lists that referenced it
    ///
    /// Every node that pointed at `id` re-selects its list from its remaining
    /// neighbors plus the removed node's neighbors. Returns false if the node
    /// did not exist. Vectors of the remaining nodes must still be in `store`.
    pub fn remove(&mut self, id: EntityId, store: &VectorStore) -> bool {
        let removed = match self.nodes.remove(&id) {
            Some(node) => node,
            None => return false,
        };

        let referrers: Vec<(EntityId, usize)> = self
            .nodes
            .iter()
            .flat_map(|(&node_id, node)| {
                node.neighbors
                    .iter()
                    .enumerate()
                    .filter(|(_, list)| list.iter().any(|n| n.id == id))
                    .map(move |(layer, _)| (node_id, layer))
            })
            .collect();

        for (node_id, layer) in referrers {
            let base = match store.get(node_id) {
                Some(v) => v,
                None => {
                    warn!(target: "strata::ann", id = node_id.as_u64(), "Skipping repair of node without stored vector");
                    continue;
                }
            };

            let mut pool: Vec<Candidate> = self
                .nodes
                .get(&node_id)
                .map(|node| {
                    node.layer(layer)
                        .iter()
                        .filter(|n| n.id != id)
                        .map(|n| Candidate {
                            distance: n.distance,
                            id: n.id,
                        })
                        .collect()
                })
                .unwrap_or_default();

            for neighbor in removed.layer(layer) {
                let eligible = neighbor.id != node_id
                    && !pool.iter().any(|c| c.id == neighbor.id)
                    && self
                        .nodes
                        .get(&neighbor.id)
                        .is_some_and(|n| n.max_layer >= layer);
                if !eligible {
                    continue;
                }
                if let Some(distance) = self.distance_to(base, neighbor.id, store) {
                    pool.push(Candidate {
                        distance,
                        id: neighbor.id,
                    });
                }
            }
            pool.sort();

            let repaired = self.select_neighbors(&pool, self.params.max_connections(layer), store);
            if let Some(node) = self.nodes.get_mut(&node_id) {
                node.neighbors[layer] = repaired;
            }
        }

        if self.entry_point == Some(id) {
            // Highest layer wins; lowest id on ties
            let elected = self
                .nodes
                .iter()
                .max_by(|a, b| a.1.max_layer.cmp(&b.1.max_layer).then_with(|| b.0.cmp(a.0)))
                .map(|(&node_id, node)| (node_id, node.max_layer));
            match elected {
                Some((node_id, layer)) => {
                    self.entry_point = Some(node_id);
                    self.max_level = layer;
                }
                None => {
                    self.entry_point = None;
                    self.max_level = 0;
                }
            }
        }
        true
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Approximate k nearest neighbors of `query`
    ///
    /// `ef` is raised to `k` if smaller. Returns at most k hits ordered by
    /// (distance asc, id asc); an empty graph yields an empty result.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        ef: usize,
        store: &VectorStore,
        cancel: Option<&CancelFlag>,
    ) -> AnnResult<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let entry_id = match self.entry_point {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };
        let entry_distance = self.distance_to(query, entry_id, store).ok_or_else(|| {
            AnnError::corruption(format!("entry point {} has no stored vector", entry_id))
        })?;

        let mut current = Candidate {
            distance: entry_distance,
            id: entry_id,
        };
        if self.max_level > 0 {
            current = self.greedy_descend(query, current, self.max_level, 1, store);
        }

        let ef = ef.max(k);
        let mut candidates = self.search_layer(query, &[current], ef, 0, store, cancel)?;
        candidates.truncate(k);

        Ok(candidates
            .into_iter()
            .map(|c| SearchHit::new(c.id, c.distance))
            .collect())
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Check every structural invariant
    ///
    /// # Errors
    ///
    /// Returns `IndexCorruption` describing the first violation found.
    pub fn validate(&self) -> AnnResult<()> {
        let global_max = self.nodes.values().map(|n| n.max_layer).max();

        match (self.entry_point, global_max) {
            (None, None) => return Ok(()),
            (Some(ep), Some(top)) => {
                let node = self.nodes.get(&ep).ok_or_else(|| {
                    AnnError::corruption(format!("entry point {} is not in the graph", ep))
                })?;
                if node.max_layer != top || self.max_level != top {
                    return Err(AnnError::corruption(format!(
                        "entry point {} has layer {}, graph max is {} (recorded {})",
                        ep, node.max_layer, top, self.max_level
                    )));
                }
            }
            (None, Some(_)) => {
                return Err(AnnError::corruption("non-empty graph has no entry point"));
            }
            (Some(ep), None) => {
                return Err(AnnError::corruption(format!(
                    "empty graph has entry point {}",
                    ep
                )));
            }
        }

        for (&id, node) in &self.nodes {
            if node.neighbors.len() != node.max_layer + 1 {
                return Err(AnnError::corruption(format!(
                    "{} has {} neighbor lists for max layer {}",
                    id,
                    node.neighbors.len(),
                    node.max_layer
                )));
            }
            for (layer, list) in node.neighbors.iter().enumerate() {
                let capacity = self.params.max_connections(layer);
                if list.len() > capacity {
                    return Err(AnnError::corruption(format!(
                        "{} has {} neighbors on layer {} (capacity {})",
                        id,
                        list.len(),
                        layer,
                        capacity
                    )));
                }
                for neighbor in list {
                    if neighbor.id == id {
                        return Err(AnnError::corruption(format!(
                            "{} links to itself on layer {}",
                            id, layer
                        )));
                    }
                    match self.nodes.get(&neighbor.id) {
                        Some(target) if target.max_layer >= layer => {}
                        Some(_) => {
                            return Err(AnnError::corruption(format!(
                                "{} links to {} above its top layer ({})",
                                id, neighbor.id, layer
                            )));
                        }
                        None => {
                            return Err(AnnError::corruption(format!(
                                "{} links to missing node {} on layer {}",
                                id, neighbor.id, layer
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Number of nodes reachable from the entry point on `layer`
    pub fn reachable_at(&self, layer: usize) -> usize {
        let entry = match self.entry_point {
            Some(ep) if layer <= self.max_level => ep,
            _ => return 0,
        };

        let mut seen: FxHashSet<EntityId> = FxHashSet::default();
        let mut queue = VecDeque::new();
        seen.insert(entry);
        queue.push_back(entry);
        while let Some(id) = queue.pop_front() {
            if let Some(node) = self.nodes.get(&id) {
                for neighbor in node.layer(layer) {
                    if seen.insert(neighbor.id) {
                        queue.push_back(neighbor.id);
                    }
                }
            }
        }
        seen.len()
    }

    /// Node, layer and edge counts
    pub fn stats(&self) -> GraphStats {
        let mut nodes_per_layer = vec![0usize; if self.nodes.is_empty() { 0 } else { self.max_level + 1 }];
        let mut edge_count = 0;
        for node in self.nodes.values() {
            for (layer, list) in node.neighbors.iter().enumerate() {
                if let Some(count) = nodes_per_layer.get_mut(layer) {
                    *count += 1;
                }
                edge_count += list.len();
            }
        }
        GraphStats {
            node_count: self.nodes.len(),
            max_level: self.max_level,
            nodes_per_layer,
            edge_count,
            entry_point: self.entry_point,
        }
    }

    /// Approximate heap bytes used by the graph structure (excludes vectors)
    pub fn memory_usage(&self) -> usize {
        self.nodes
            .values()
            .map(|node| {
                node.neighbors
                    .iter()
                    .map(|list| list.capacity() * std::mem::size_of::<Neighbor>())
                    .sum::<usize>()
                    + std::mem::size_of::<GraphNode>()
                    + std::mem::size_of::<EntityId>()
                    + 16 // BTreeMap entry overhead
            })
            .sum()
    }
}

impl std::fmt::Debug for HnswGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HnswGraph")
            .field("metric", &self.distance.name())
            .field("nodes", &self.nodes.len())
            .field("entry_point", &self.entry_point)
            .field("max_level", &self.max_level)
            .finish()
    }
}
