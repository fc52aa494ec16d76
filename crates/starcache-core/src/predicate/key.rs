use crate::{bitkey::BitKey, predicate::StarPredicate, schema::StarId};
use std::fmt;

///
/// AggregationKey
///
/// Identifies a class of requests that one SQL aggregation can answer: the
/// star, the grouped columns, and the compound predicates filtered on
/// beyond per-column constraints. Compound predicates are kept sorted.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct AggregationKey {
    star: StarId,
    bitkey: BitKey,
    compound: Vec<StarPredicate>,
}

impl AggregationKey {
    #[must_use]
    pub fn new(star: StarId, bitkey: BitKey, mut compound: Vec<StarPredicate>) -> Self {
        compound.sort();
        compound.dedup();

        Self {
            star,
            bitkey,
            compound,
        }
    }

    #[must_use]
    pub const fn star(&self) -> StarId {
        self.star
    }

    #[must_use]
    pub const fn bitkey(&self) -> BitKey {
        self.bitkey
    }

    #[must_use]
    pub fn compound(&self) -> &[StarPredicate] {
        &self.compound
    }

    /// Columns referenced by the compound predicates.
    #[must_use]
    pub fn compound_columns(&self) -> BitKey {
        self.compound
            .iter()
            .fold(BitKey::new(), |acc, p| acc.or(&p.columns()))
    }
}

impl fmt::Display for AggregationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.star, self.bitkey)?;
        for predicate in &self.compound {
            write!(f, " {predicate}")?;
        }

        Ok(())
    }
}
