//! Predicate trees for attribute filtering
//!
//! A `Predicate` is evaluated per candidate id by a `FilterEvaluator`. The
//! ANN engine never sees predicates, only the resulting `matches(id)` answer.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// String comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringOp {
    /// Whole value equals
    Equals,
    /// Whole value differs
    NotEquals,
    /// Value contains the operand
    Contains,
    /// Value starts with the operand
    StartsWith,
    /// Value ends with the operand
    EndsWith,
}

/// Numeric comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumOp {
    /// ==
    Eq,
    /// !=
    NotEq,
    /// <
    Lt,
    /// <=
    Le,
    /// >
    Gt,
    /// >=
    Ge,
}

/// Numeric operand
///
/// Integers are compared exactly against integer attributes; any other
/// combination is compared as f64.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    /// Integer operand
    Int(i64),
    /// Floating-point operand
    Float(f64),
}

impl Number {
    /// Value as f64
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    /// Compare two numbers; `None` if either is NaN
    pub fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

impl From<i64> for Number {
    fn from(v: i64) -> Self {
        Number::Int(v)
    }
}

impl From<i32> for Number {
    fn from(v: i32) -> Self {
        Number::Int(v as i64)
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Number::Float(v)
    }
}

impl NumOp {
    /// Apply the operator to an ordering of (attribute, operand)
    pub fn accepts(self, ordering: Ordering) -> bool {
        match self {
            NumOp::Eq => ordering == Ordering::Equal,
            NumOp::NotEq => ordering != Ordering::Equal,
            NumOp::Lt => ordering == Ordering::Less,
            NumOp::Le => ordering != Ordering::Greater,
            NumOp::Gt => ordering == Ordering::Greater,
            NumOp::Ge => ordering != Ordering::Less,
        }
    }
}

/// Attribute predicate tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// String comparison on a string attribute
    Str {
        /// Attribute name
        attribute: String,
        /// Operator
        op: StringOp,
        /// Operand
        value: String,
        /// Compare case-sensitively
        case_sensitive: bool,
    },
    /// Numeric comparison on an integer or float attribute
    Num {
        /// Attribute name
        attribute: String,
        /// Operator
        op: NumOp,
        /// Operand
        value: Number,
    },
    /// Inclusive range `low <= attribute <= high`
    Between {
        /// Attribute name
        attribute: String,
        /// Lower bound (inclusive)
        low: Number,
        /// Upper bound (inclusive)
        high: Number,
    },
    /// All children match (empty = true)
    And(Vec<Predicate>),
    /// Any child matches (empty = false)
    Or(Vec<Predicate>),
}

impl Predicate {
    /// String predicate
    pub fn string(
        attribute: impl Into<String>,
        op: StringOp,
        value: impl Into<String>,
        case_sensitive: bool,
    ) -> Self {
        Predicate::Str {
            attribute: attribute.into(),
            op,
            value: value.into(),
            case_sensitive,
        }
    }

    /// Numeric predicate
    pub fn number(attribute: impl Into<String>, op: NumOp, value: impl Into<Number>) -> Self {
        Predicate::Num {
            attribute: attribute.into(),
            op,
            value: value.into(),
        }
    }

    /// Inclusive range predicate
    pub fn between(
        attribute: impl Into<String>,
        low: impl Into<Number>,
        high: impl Into<Number>,
    ) -> Self {
        Predicate::Between {
            attribute: attribute.into(),
            low: low.into(),
            high: high.into(),
        }
    }

    /// Conjunction, flattening nested `And`s
    pub fn and(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::And(mut a), Predicate::And(b)) => {
                a.extend(b);
                Predicate::And(a)
            }
            (Predicate::And(mut a), p) => {
                a.push(p);
                Predicate::And(a)
            }
            (p, Predicate::And(mut b)) => {
                b.insert(0, p);
                Predicate::And(b)
            }
            (a, b) => Predicate::And(vec![a, b]),
        }
    }

    /// Disjunction
    pub fn or(self, other: Predicate) -> Self {
        match self {
            Predicate::Or(mut a) => {
                a.push(other);
                Predicate::Or(a)
            }
            p => Predicate::Or(vec![p, other]),
        }
    }

    /// Every attribute name referenced by the tree
    pub fn attributes(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_attributes(&mut out);
        out
    }

    fn collect_attributes<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Predicate::Str { attribute, .. }
            | Predicate::Num { attribute, .. }
            | Predicate::Between { attribute, .. } => out.push(attribute),
            Predicate::And(children) | Predicate::Or(children) => {
                for child in children {
                    child.collect_attributes(out);
                }
            }
        }
    }
}

/// Evaluate a string operator
pub(crate) fn string_matches(
    op: StringOp,
    attribute: &str,
    operand: &str,
    case_sensitive: bool,
) -> bool {
    if case_sensitive {
        apply_string_op(op, attribute, operand)
    } else {
        apply_string_op(op, &attribute.to_lowercase(), &operand.to_lowercase())
    }
}

fn apply_string_op(op: StringOp, attribute: &str, operand: &str) -> bool {
    match op {
        StringOp::Equals => attribute == operand,
        StringOp::NotEquals => attribute != operand,
        StringOp::Contains => attribute.contains(operand),
        StringOp::StartsWith => attribute.starts_with(operand),
        StringOp::EndsWith => attribute.ends_with(operand),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_ops() {
        assert!(string_matches(StringOp::Contains, "Red apple", "red", false));
        assert!(!string_matches(StringOp::Contains, "Red apple", "red", true));
        assert!(string_matches(StringOp::StartsWith, "Blue sea", "Blue", true));
        assert!(!string_matches(StringOp::StartsWith, "Lightblue", "Blue", true));
        assert!(string_matches(StringOp::EndsWith, "Lightblue", "BLUE", false));
        assert!(string_matches(StringOp::Equals, "Tired", "tired", false));
        assert!(string_matches(StringOp::NotEquals, "Tired", "tired", true));
    }

    #[test]
    fn test_number_compare() {
        assert_eq!(Number::Int(3).compare(Number::Int(4)), Some(Ordering::Less));
        assert_eq!(Number::Int(3).compare(Number::Float(3.0)), Some(Ordering::Equal));
        assert_eq!(Number::Float(f64::NAN).compare(Number::Int(1)), None);
        assert_eq!(
            Number::Int(i64::MAX).compare(Number::Int(i64::MAX - 1)),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_num_op_accepts() {
        assert!(NumOp::Le.accepts(Ordering::Equal));
        assert!(NumOp::Le.accepts(Ordering::Less));
        assert!(!NumOp::Lt.accepts(Ordering::Equal));
        assert!(NumOp::NotEq.accepts(Ordering::Greater));
        assert!(NumOp::Ge.accepts(Ordering::Greater));
    }

    #[test]
    fn test_and_flattens() {
        let p = Predicate::number("a", NumOp::Eq, 1)
            .and(Predicate::number("b", NumOp::Eq, 2))
            .and(Predicate::number("c", NumOp::Eq, 3));
        match &p {
            Predicate::And(children) => assert_eq!(children.len(), 3),
            other => panic!("expected And, got {:?}", other),
        }
        assert_eq!(p.attributes(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_or_and_attributes() {
        let p = Predicate::string("name", StringOp::Contains, "x", true)
            .or(Predicate::between("year", 2000, 2010));
        assert_eq!(p.attributes(), vec!["name", "year"]);
    }
}
