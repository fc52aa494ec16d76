//! Star predicates and aggregation keys.
//!
//! Predicates describe *what* a request constrains, independent of SQL.
//! Lowering to SQL text belongs to the dialect.

mod build;
mod key;
mod value_set;


use crate::{bitkey::BitKey, error::InternalError, schema::ColumnId, value::Value};
use std::fmt;

pub use build::{column_predicate, compound_predicate};
pub use key::AggregationKey;
pub use value_set::{RangeBound, ValueRange, ValueSet};

///
/// StarPredicate
///
/// Immutable constraint tree. `And`/`Or` nodes are only reachable through
/// [`StarPredicate::and`] and [`StarPredicate::or`], which flatten, sort, and
/// dedup their children and collapse a single child to itself. Structural
/// equality is therefore independent of operand order.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum StarPredicate {
    Value(ValuePredicate),
    Range(RangePredicate),
    And(AndPredicate),
    Or(OrPredicate),
}

impl StarPredicate {
    #[must_use]
    pub fn value(column: ColumnId, value: impl Into<Value>) -> Self {
        Self::Value(ValuePredicate {
            column,
            value: value.into(),
        })
    }

    #[must_use]
    pub const fn range(column: ColumnId, range: ValueRange) -> Self {
        Self::Range(RangePredicate { column, range })
    }

    /// Conjunction of `children`.
    pub fn and(children: Vec<Self>) -> Result<Self, InternalError> {
        let children = canonical_children(children, |p| match p {
            Self::And(and) => Ok(and.children),
            other => Err(other),
        });

        collapse(children, "and", |children| Self::And(AndPredicate { children }))
    }

    /// Disjunction of `children`.
    pub fn or(children: Vec<Self>) -> Result<Self, InternalError> {
        let children = canonical_children(children, |p| match p {
            Self::Or(or) => Ok(or.children),
            other => Err(other),
        });

        collapse(children, "or", |children| Self::Or(OrPredicate { children }))
    }

    /// Columns referenced anywhere in the tree.
    #[must_use]
    pub fn columns(&self) -> BitKey {
        let mut key = BitKey::new();
        self.collect_columns(&mut key);

        key
    }

    fn collect_columns(&self, key: &mut BitKey) {
        match self {
            Self::Value(p) => key.set(p.column),
            Self::Range(p) => key.set(p.column),
            Self::And(AndPredicate { children }) | Self::Or(OrPredicate { children }) => {
                for child in children {
                    child.collect_columns(key);
                }
            }
        }
    }
}

fn collapse(
    children: Vec<StarPredicate>,
    kind: &str,
    wrap: impl FnOnce(Vec<StarPredicate>) -> StarPredicate,
) -> Result<StarPredicate, InternalError> {
    if children.len() > 1 {
        return Ok(wrap(children));
    }

    children.into_iter().next().ok_or_else(|| {
        InternalError::predicate_invalid(format!("{kind} predicate requires operands"))
    })
}

// Flatten same-kind children, then sort and dedup.
fn canonical_children(
    children: Vec<StarPredicate>,
    split: impl Fn(StarPredicate) -> Result<Vec<StarPredicate>, StarPredicate>,
) -> Vec<StarPredicate> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        match split(child) {
            Ok(nested) => out.extend(nested),
            Err(leaf) => out.push(leaf),
        }
    }
    out.sort();
    out.dedup();

    out
}

impl fmt::Display for StarPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(p) => write!(f, "{} = {}", p.column, p.value),
            Self::Range(p) => write!(f, "{} in {}", p.column, p.range),
            Self::And(AndPredicate { children }) => write_joined(f, children, " and "),
            Self::Or(OrPredicate { children }) => write_joined(f, children, " or "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[StarPredicate], sep: &str) -> fmt::Result {
    let parts: Vec<String> = children.iter().map(ToString::to_string).collect();
    write!(f, "({})", parts.join(sep))
}

///
/// ValuePredicate
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ValuePredicate {
    pub column: ColumnId,
    pub value: Value,
}

///
/// RangePredicate
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RangePredicate {
    pub column: ColumnId,
    pub range: ValueRange,
}

///
/// AndPredicate
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct AndPredicate {
    children: Vec<StarPredicate>,
}

impl AndPredicate {
    #[must_use]
    pub fn children(&self) -> &[StarPredicate] {
        &self.children
    }
}

///
/// OrPredicate
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct OrPredicate {
    children: Vec<StarPredicate>,
}

impl OrPredicate {
    #[must_use]
    pub fn children(&self) -> &[StarPredicate] {
        &self.children
    }
}
