//! Predicate evaluation
//!
//! `FilterEvaluator` answers "does entity `id` satisfy this predicate?".
//! `AttributeFilter` is the reference evaluator over an `AttributeSource`.
//!
//! Missing attributes and type mismatches never match, including for
//! `NotEquals` / `NotEq`.

use std::sync::Arc;

use strata_ann_core::EntityId;

use crate::predicate::{string_matches, Number, Predicate};
use crate::repository::{AttributeSource, AttributeValue};

/// Predicate evaluation capability
pub trait FilterEvaluator: Send + Sync {
    /// Whether entity `id` satisfies `predicate`
    fn matches(&self, id: EntityId, predicate: &Predicate) -> bool;
}

/// Evaluates predicates against attribute values read from a source
#[derive(Debug)]
pub struct AttributeFilter<S> {
    source: Arc<S>,
}

impl<S: AttributeSource> AttributeFilter<S> {
    /// Evaluator reading from `source`
    pub fn new(source: Arc<S>) -> Self {
        AttributeFilter { source }
    }

    fn number(&self, id: EntityId, attribute: &str) -> Option<Number> {
        match self.source.attribute(id, attribute)? {
            AttributeValue::Int(i) => Some(Number::Int(i)),
            AttributeValue::Float(f) => Some(Number::Float(f)),
            AttributeValue::String(_) => None,
        }
    }
}

impl<S: AttributeSource> FilterEvaluator for AttributeFilter<S> {
    fn matches(&self, id: EntityId, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::Str {
                attribute,
                op,
                value,
                case_sensitive,
            } => match self.source.attribute(id, attribute) {
                Some(AttributeValue::String(s)) => string_matches(*op, &s, value, *case_sensitive),
                _ => false,
            },
            Predicate::Num {
                attribute,
                op,
                value,
            } => self
                .number(id, attribute)
                .and_then(|n| n.compare(*value))
                .map_or(false, |ordering| op.accepts(ordering)),
            Predicate::Between {
                attribute,
                low,
                high,
            } => match self.number(id, attribute) {
                Some(n) => {
                    n.compare(*low).map_or(false, |o| o.is_ge())
                        && n.compare(*high).map_or(false, |o| o.is_le())
                }
                None => false,
            },
            Predicate::And(children) => children.iter().all(|p| self.matches(id, p)),
            Predicate::Or(children) => children.iter().any(|p| self.matches(id, p)),
        }
    }
}
