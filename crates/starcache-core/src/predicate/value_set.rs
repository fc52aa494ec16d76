use crate::{error::InternalError, value::Value};
use std::{collections::BTreeSet, fmt};

///
/// RangeBound
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum RangeBound {
    Unbounded,
    Inclusive(Value),
    Exclusive(Value),
}

impl RangeBound {
    const fn value(&self) -> Option<&Value> {
        match self {
            Self::Unbounded => None,
            Self::Inclusive(v) | Self::Exclusive(v) => Some(v),
        }
    }
}

// `a` as a lower bound admits everything `b` admits.
fn lower_at_or_below(a: &RangeBound, b: &RangeBound) -> bool {
    match (a, b) {
        (RangeBound::Unbounded, _) => true,
        (_, RangeBound::Unbounded) => false,
        (RangeBound::Exclusive(x), RangeBound::Inclusive(y)) => x < y,
        (RangeBound::Inclusive(x) | RangeBound::Exclusive(x), _) => b.value().is_some_and(|y| x <= y),
    }
}

// `a` as an upper bound admits everything `b` admits.
fn upper_at_or_above(a: &RangeBound, b: &RangeBound) -> bool {
    match (a, b) {
        (RangeBound::Unbounded, _) => true,
        (_, RangeBound::Unbounded) => false,
        (RangeBound::Exclusive(x), RangeBound::Inclusive(y)) => x > y,
        (RangeBound::Inclusive(x) | RangeBound::Exclusive(x), _) => b.value().is_some_and(|y| x >= y),
    }
}

// Nothing lies between `upper` and the later `lower`.
fn upper_below_lower(upper: &RangeBound, lower: &RangeBound) -> bool {
    match (upper, lower) {
        (RangeBound::Unbounded, _) | (_, RangeBound::Unbounded) => false,
        (RangeBound::Inclusive(x), RangeBound::Inclusive(y)) => x < y,
        (RangeBound::Inclusive(x) | RangeBound::Exclusive(x), _) => {
            lower.value().is_some_and(|y| x <= y)
        }
    }
}

///
/// ValueRange
///
/// Non-empty interval over one column's values. Either end may be open.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ValueRange {
    lower: RangeBound,
    upper: RangeBound,
}

impl ValueRange {
    pub fn new(lower: RangeBound, upper: RangeBound) -> Result<Self, InternalError> {
        if upper_below_lower(&upper, &lower) {
            return Err(InternalError::predicate_invalid(format!(
                "empty range: {}",
                Self { lower, upper }
            )));
        }

        Ok(Self { lower, upper })
    }

    #[must_use]
    pub const fn lower(&self) -> &RangeBound {
        &self.lower
    }

    #[must_use]
    pub const fn upper(&self) -> &RangeBound {
        &self.upper
    }

    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        let above = match &self.lower {
            RangeBound::Unbounded => true,
            RangeBound::Inclusive(v) => v <= value,
            RangeBound::Exclusive(v) => v < value,
        };
        let below = match &self.upper {
            RangeBound::Unbounded => true,
            RangeBound::Inclusive(v) => value <= v,
            RangeBound::Exclusive(v) => value < v,
        };

        above && below
    }

    #[must_use]
    pub fn contains_range(&self, other: &Self) -> bool {
        lower_at_or_below(&self.lower, &other.lower) && upper_at_or_above(&self.upper, &other.upper)
    }

    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        !upper_below_lower(&self.upper, &other.lower) && !upper_below_lower(&other.upper, &self.lower)
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lower {
            RangeBound::Unbounded => write!(f, "(*")?,
            RangeBound::Inclusive(v) => write!(f, "[{v}")?,
            RangeBound::Exclusive(v) => write!(f, "({v}")?,
        }
        match &self.upper {
            RangeBound::Unbounded => write!(f, ", *)"),
            RangeBound::Inclusive(v) => write!(f, ", {v}]"),
            RangeBound::Exclusive(v) => write!(f, ", {v})"),
        }
    }
}

///
/// ValueSet
///
/// Finite values plus ranges requested for, or stored against, one column.
///

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct ValueSet {
    values: BTreeSet<Value>,
    ranges: Vec<ValueRange>,
}

impl ValueSet {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: BTreeSet::new(),
            ranges: Vec::new(),
        }
    }

    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            values: values.into_iter().collect(),
            ranges: Vec::new(),
        }
    }

    #[must_use]
    pub fn from_range(range: ValueRange) -> Self {
        Self {
            values: BTreeSet::new(),
            ranges: vec![range],
        }
    }

    pub fn insert(&mut self, value: Value) -> bool {
        self.values.insert(value)
    }

    pub fn insert_range(&mut self, range: ValueRange) {
        if !self.ranges.contains(&range) {
            self.ranges.push(range);
            self.ranges.sort();
        }
    }

    pub fn extend(&mut self, other: &Self) {
        self.values.extend(other.values.iter().cloned());
        for range in &other.ranges {
            self.insert_range(range.clone());
        }
    }

    #[must_use]
    pub fn values(&self) -> &BTreeSet<Value> {
        &self.values
    }

    #[must_use]
    pub fn ranges(&self) -> &[ValueRange] {
        &self.ranges
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.ranges.is_empty()
    }

    /// Number of finite values; ranges are not counted.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn has_ranges(&self) -> bool {
        !self.ranges.is_empty()
    }

    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        self.values.contains(value) || self.ranges.iter().any(|r| r.contains(value))
    }

    #[must_use]
    pub fn contains_range(&self, range: &ValueRange) -> bool {
        self.ranges.iter().any(|r| r.contains_range(range))
    }

    /// True when every value and range of `other` is admitted by `self`.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        other.values.iter().all(|v| self.contains(v))
            && other.ranges.iter().all(|r| self.contains_range(r))
    }

    /// True when some value or range of `other` is admitted by `self`, or
    /// the two share part of a range.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        other.values.iter().any(|v| self.contains(v))
            || self.values.iter().any(|v| other.contains(v))
            || self
                .ranges
                .iter()
                .any(|a| other.ranges.iter().any(|b| a.overlaps(b)))
    }

    /// Drop the finite values admitted by `other`; returns how many went.
    pub fn remove_covered_by(&mut self, other: &Self) -> usize {
        let before = self.values.len();
        self.values.retain(|v| !other.contains(v));

        before - self.values.len()
    }

    /// Copy of `self` without the parts `excluded` already admits.
    #[must_use]
    pub fn without(&self, excluded: &Self) -> Self {
        Self {
            values: self
                .values
                .iter()
                .filter(|v| !excluded.contains(v))
                .cloned()
                .collect(),
            ranges: self
                .ranges
                .iter()
                .filter(|r| !excluded.contains_range(r))
                .cloned()
                .collect(),
        }
    }
}

impl fmt::Display for ValueSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .values
            .iter()
            .map(ToString::to_string)
            .chain(self.ranges.iter().map(ToString::to_string))
            .collect();

        write!(f, "({})", parts.join(", "))
    }
}

impl FromIterator<Value> for ValueSet {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::from_values(iter)
    }
}
