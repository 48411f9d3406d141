//! Query building and execution
//!
//! A query combines exactly one nearest-neighbor condition with an optional
//! attribute predicate:
//!
//! ```text
//! let query = engine
//!     .query()
//!     .nearest_neighbors_f32("vector", &[4.1, 4.2], 6)
//!     .contains_string("name", "red", false)
//!     .build()?;
//! let hits = query.find_ids_with_scores()?;
//! ```
//!
//! Semantics:
//! - the ANN condition yields up to k score-ordered hits; the predicate
//!   keeps the subset that matches (evaluated once per candidate)
//! - score order is ascending distance, ties by ascending id
//! - id order re-sorts the same filtered set; membership never changes
//! - offset is applied before limit; limit 0 means unbounded
//!
//! The filtered set is cached inside the `Query` together with the index
//! version it was computed against. Changing offset/limit re-slices the
//! cache; any index mutation invalidates it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use strata_ann_core::{AnnError, AnnResult, EntityId, FilterStrategy, SearchHit};
use strata_ann_engine::{AnnSearcher, CandidateFilter};
use tracing::debug;

use crate::filter::{AttributeFilter, FilterEvaluator};
use crate::predicate::{Number, NumOp, Predicate, StringOp};
use crate::repository::{AttributeSource, EntityRepository};

/// Result ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderBy {
    /// Ascending distance, ties by ascending id
    #[default]
    Score,
    /// Ascending id
    Id,
}

/// Entry point for building queries over a repository and its ANN indexes
pub struct QueryEngine<R: EntityRepository> {
    repository: Arc<R>,
    evaluator: Arc<dyn FilterEvaluator>,
    indexes: BTreeMap<String, Arc<AnnSearcher>>,
}

impl<R: EntityRepository> QueryEngine<R> {
    /// Engine with an explicit predicate evaluator and no indexes
    pub fn new(repository: Arc<R>, evaluator: Arc<dyn FilterEvaluator>) -> Self {
        QueryEngine {
            repository,
            evaluator,
            indexes: BTreeMap::new(),
        }
    }

    /// Register the ANN index for a vector attribute, replacing any
    /// previous one
    pub fn register_index(
        &mut self,
        attribute: impl Into<String>,
        searcher: Arc<AnnSearcher>,
    ) -> Option<Arc<AnnSearcher>> {
        self.indexes.insert(attribute.into(), searcher)
    }

    /// Builder-style `register_index`
    pub fn with_index(mut self, attribute: impl Into<String>, searcher: Arc<AnnSearcher>) -> Self {
        self.register_index(attribute, searcher);
        self
    }

    /// ANN index registered for `attribute`
    pub fn index(&self, attribute: &str) -> Option<&Arc<AnnSearcher>> {
        self.indexes.get(attribute)
    }

    /// The entity repository
    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Start a new query
    pub fn query(&self) -> QueryBuilder<'_, R> {
        QueryBuilder {
            engine: self,
            nearest: Vec::new(),
            predicates: Vec::new(),
            offset: 0,
            limit: 0,
        }
    }
}

impl<R> QueryEngine<R>
where
    R: EntityRepository + AttributeSource + 'static,
{
    /// Engine evaluating predicates against the repository's own attributes
    pub fn with_attribute_filter(repository: Arc<R>) -> Self {
        let evaluator: Arc<dyn FilterEvaluator> =
            Arc::new(AttributeFilter::new(Arc::clone(&repository)));
        Self::new(repository, evaluator)
    }
}

#[derive(Debug, Clone)]
struct NearestNeighbors {
    attribute: String,
    vector: Vec<f32>,
    k: usize,
}

/// Accumulates conditions; `build` validates them into a `Query`
pub struct QueryBuilder<'a, R: EntityRepository> {
    engine: &'a QueryEngine<R>,
    nearest: Vec<NearestNeighbors>,
    predicates: Vec<Predicate>,
    offset: usize,
    limit: usize,
}

impl<'a, R: EntityRepository> QueryBuilder<'a, R> {
    /// k nearest neighbors of `vector` on the indexed attribute
    pub fn nearest_neighbors(mut self, attribute: impl Into<String>, vector: &[f32], k: usize) -> Self {
        self.nearest.push(NearestNeighbors {
            attribute: attribute.into(),
            vector: vector.to_vec(),
            k,
        });
        self
    }

    /// Alias of `nearest_neighbors`
    pub fn nearest_neighbors_f32(self, attribute: impl Into<String>, vector: &[f32], k: usize) -> Self {
        self.nearest_neighbors(attribute, vector, k)
    }

    /// Add a predicate; all predicates are AND-combined
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Attribute contains `value`
    pub fn contains_string(self, attribute: &str, value: &str, case_sensitive: bool) -> Self {
        self.filter(Predicate::string(attribute, StringOp::Contains, value, case_sensitive))
    }

    /// Attribute starts with `value`
    pub fn starts_with_string(self, attribute: &str, value: &str, case_sensitive: bool) -> Self {
        self.filter(Predicate::string(attribute, StringOp::StartsWith, value, case_sensitive))
    }

    /// Attribute ends with `value`
    pub fn ends_with_string(self, attribute: &str, value: &str, case_sensitive: bool) -> Self {
        self.filter(Predicate::string(attribute, StringOp::EndsWith, value, case_sensitive))
    }

    /// Attribute equals `value`
    pub fn equals_string(self, attribute: &str, value: &str, case_sensitive: bool) -> Self {
        self.filter(Predicate::string(attribute, StringOp::Equals, value, case_sensitive))
    }

    /// Integer attribute equals `value`
    pub fn equals_int(self, attribute: &str, value: i64) -> Self {
        self.filter(Predicate::number(attribute, NumOp::Eq, value))
    }

    /// Numeric attribute is greater than `value`
    pub fn greater_than(self, attribute: &str, value: impl Into<Number>) -> Self {
        self.filter(Predicate::number(attribute, NumOp::Gt, value))
    }

    /// Numeric attribute is less than `value`
    pub fn less_than(self, attribute: &str, value: impl Into<Number>) -> Self {
        self.filter(Predicate::number(attribute, NumOp::Lt, value))
    }

    /// Numeric attribute lies in `[low, high]`
    pub fn between(self, attribute: &str, low: impl Into<Number>, high: impl Into<Number>) -> Self {
        self.filter(Predicate::between(attribute, low, high))
    }

    /// Default offset of the built query
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Default limit of the built query (0 = unbounded)
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Validate the conditions and produce an executable query
    ///
    /// The builder is left untouched, so building twice yields equivalent
    /// queries.
    ///
    /// # Errors
    ///
    /// `InvalidQuery` if there is no or more than one nearest-neighbor
    /// condition, k is 0, the attribute has no index, or the query vector
    /// has the wrong dimension or non-finite components.
    pub fn build(&self) -> AnnResult<Query<R>> {
        let nearest = match self.nearest.as_slice() {
            [] => {
                return Err(AnnError::invalid_query(
                    "query needs a nearest-neighbors condition",
                ))
            }
            [one] => one,
            many => {
                return Err(AnnError::invalid_query(format!(
                    "only one nearest-neighbors condition is supported, got {}",
                    many.len()
                )))
            }
        };
        if nearest.k == 0 {
            return Err(AnnError::invalid_query("k must be > 0"));
        }
        let searcher = self.engine.index(&nearest.attribute).ok_or_else(|| {
            AnnError::invalid_query(format!(
                "attribute '{}' has no nearest-neighbor index",
                nearest.attribute
            ))
        })?;
        if nearest.vector.len() != searcher.dimension() {
            return Err(AnnError::invalid_query(format!(
                "query vector has dimension {}, index '{}' expects {}",
                nearest.vector.len(),
                nearest.attribute,
                searcher.dimension()
            )));
        }
        if nearest.vector.iter().any(|x| !x.is_finite()) {
            return Err(AnnError::invalid_query("query vector has non-finite components"));
        }

        let predicate = match self.predicates.as_slice() {
            [] => None,
            [one] => Some(one.clone()),
            many => Some(Predicate::And(many.to_vec())),
        };

        debug!(
            target: "strata::ann",
            attribute = %nearest.attribute,
            k = nearest.k,
            filtered = predicate.is_some(),
            "Built query"
        );

        Ok(Query {
            repository: Arc::clone(&self.engine.repository),
            evaluator: Arc::clone(&self.engine.evaluator),
            searcher: Arc::clone(searcher),
            vector: nearest.vector.clone(),
            k: nearest.k,
            predicate,
            offset: self.offset,
            limit: self.limit,
            cache: Mutex::new(None),
        })
    }
}

struct CachedHits {
    version: u64,
    hits: Arc<Vec<SearchHit>>,
}

/// Adapts a predicate + evaluator to the engine's filter capability
struct PredicateFilter<'a> {
    evaluator: &'a dyn FilterEvaluator,
    predicate: &'a Predicate,
}

impl CandidateFilter for PredicateFilter<'_> {
    fn matches(&self, id: EntityId) -> bool {
        self.evaluator.matches(id, self.predicate)
    }
}

/// Validated, executable query
pub struct Query<R: EntityRepository> {
    repository: Arc<R>,
    evaluator: Arc<dyn FilterEvaluator>,
    searcher: Arc<AnnSearcher>,
    vector: Vec<f32>,
    k: usize,
    predicate: Option<Predicate>,
    offset: usize,
    limit: usize,
    cache: Mutex<Option<CachedHits>>,
}

impl<R: EntityRepository> Query<R> {
    /// Number of results to skip
    pub fn set_offset(&mut self, offset: usize) -> &mut Self {
        self.offset = offset;
        self
    }

    /// Maximum number of results (0 = unbounded)
    pub fn set_limit(&mut self, limit: usize) -> &mut Self {
        self.limit = limit;
        self
    }

    /// Current offset
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Current limit
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Requested neighbor count
    pub fn k(&self) -> usize {
        self.k
    }

    /// Combined attribute predicate, if any
    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    /// Filtered, score-ordered hits
    ///
    /// The predicate is evaluated on every call so attribute changes are
    /// always visible; only the ANN candidate search is cached.
    fn filtered_hits(&self) -> AnnResult<Vec<SearchHit>> {
        let predicate = match &self.predicate {
            Some(predicate) => predicate,
            None => return Ok(self.candidates()?.as_ref().clone()),
        };
        let matcher = PredicateFilter {
            evaluator: self.evaluator.as_ref(),
            predicate,
        };

        match self.searcher.strategy() {
            FilterStrategy::TopK => Ok(self
                .candidates()?
                .iter()
                .filter(|h| matcher.matches(h.id))
                .copied()
                .collect()),
            // predicate drives escalation; not cached
            FilterStrategy::FillK => self
                .searcher
                .search(&self.vector, self.k, Some(&matcher as &dyn CandidateFilter)),
        }
    }

    /// Unfiltered top-k for the current index version
    fn candidates(&self) -> AnnResult<Arc<Vec<SearchHit>>> {
        let current = self.searcher.version();
        if let Some(cached) = self.cache.lock().as_ref() {
            if cached.version == current {
                return Ok(Arc::clone(&cached.hits));
            }
        }

        let (version, hits) = self.searcher.search_versioned(&self.vector, self.k, None)?;
        let hits = Arc::new(hits);
        *self.cache.lock() = Some(CachedHits {
            version,
            hits: Arc::clone(&hits),
        });
        Ok(hits)
    }

    /// Run the query and return hits in the requested order, after
    /// offset and limit
    pub fn execute(&self, order: OrderBy) -> AnnResult<Vec<SearchHit>> {
        let start = Instant::now();
        let mut ordered = self.filtered_hits()?;
        let matched = ordered.len();
        if order == OrderBy::Id {
            ordered.sort_by_key(|h| h.id);
        }
        let page = paginate(ordered, self.offset, self.limit);

        debug!(
            target: "strata::ann",
            k = self.k,
            matched,
            offset = self.offset,
            limit = self.limit,
            order = ?order,
            results = page.len(),
            duration_us = start.elapsed().as_micros() as u64,
            "Query executed"
        );
        Ok(page)
    }

    /// `(id, score)` pairs in score order
    pub fn find_ids_with_scores(&self) -> AnnResult<Vec<(EntityId, f32)>> {
        Ok(self
            .execute(OrderBy::Score)?
            .into_iter()
            .map(|h| (h.id, h.score))
            .collect())
    }

    /// `(entity, score)` pairs in score order; unresolvable ids are skipped
    pub fn find_with_scores(&self) -> AnnResult<Vec<(R::Entity, f32)>> {
        let hits = self.execute(OrderBy::Score)?;
        let ids: Vec<EntityId> = hits.iter().map(|h| h.id).collect();
        let entities = self.repository.resolve_each(&ids)?;
        Ok(entities
            .into_iter()
            .zip(hits)
            .filter_map(|(entity, hit)| entity.map(|e| (e, hit.score)))
            .collect())
    }

    /// Ids in ascending id order
    pub fn find_ids(&self) -> AnnResult<Vec<EntityId>> {
        Ok(self
            .execute(OrderBy::Id)?
            .into_iter()
            .map(|h| h.id)
            .collect())
    }

    /// Entities in ascending id order
    pub fn find(&self) -> AnnResult<Vec<R::Entity>> {
        let ids = self.find_ids()?;
        self.repository.resolve(&ids)
    }

    /// Size of the filtered set, ignoring offset and limit
    pub fn count(&self) -> AnnResult<usize> {
        Ok(self.filtered_hits()?.len())
    }
}

impl<R: EntityRepository> std::fmt::Debug for Query<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("k", &self.k)
            .field("predicate", &self.predicate)
            .field("offset", &self.offset)
            .field("limit", &self.limit)
            .finish()
    }
}

fn paginate(hits: Vec<SearchHit>, offset: usize, limit: usize) -> Vec<SearchHit> {
    let take = if limit == 0 { usize::MAX } else { limit };
    hits.into_iter().skip(offset).take(take).collect()
}
