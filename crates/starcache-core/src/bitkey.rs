//! Fixed-width column bitsets.

use crate::schema::ColumnId;
use std::fmt;

///
/// BitKey
///
/// A 256-bit set of constrained columns, counted from the least significant
/// bit of the first word. Equality and hashing are structural so a BitKey can
/// key grouping maps directly.
///

#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BitKey {
    bits: [u64; 4],
}

impl BitKey {
    pub const CAPACITY: usize = 256;

    #[must_use]
    pub const fn new() -> Self {
        Self { bits: [0; 4] }
    }

    #[must_use]
    pub fn from_columns(columns: impl IntoIterator<Item = ColumnId>) -> Self {
        let mut key = Self::new();
        for column in columns {
            key.set(column);
        }

        key
    }

    pub const fn set(&mut self, column: ColumnId) {
        let i = column.index();
        self.bits[i / 64] |= 1 << (i % 64);
    }

    pub const fn clear(&mut self, column: ColumnId) {
        let i = column.index();
        self.bits[i / 64] &= !(1 << (i % 64));
    }

    #[must_use]
    pub const fn get(&self, column: ColumnId) -> bool {
        let i = column.index();
        (self.bits[i / 64] & (1 << (i % 64))) != 0
    }

    #[must_use]
    pub fn cardinality(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|w| *w == 0)
    }

    /// True when every bit of `other` is also set in `self`.
    #[must_use]
    pub fn is_superset_of(&self, other: &Self) -> bool {
        self.bits
            .iter()
            .zip(other.bits.iter())
            .all(|(a, b)| a & b == *b)
    }

    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.bits
            .iter()
            .zip(other.bits.iter())
            .any(|(a, b)| a & b != 0)
    }

    #[must_use]
    pub fn and(&self, other: &Self) -> Self {
        self.combine(other, |a, b| a & b)
    }

    #[must_use]
    pub fn or(&self, other: &Self) -> Self {
        self.combine(other, |a, b| a | b)
    }

    #[must_use]
    pub fn and_not(&self, other: &Self) -> Self {
        self.combine(other, |a, b| a & !b)
    }

    fn combine(&self, other: &Self, op: impl Fn(u64, u64) -> u64) -> Self {
        let mut bits = [0; 4];
        for (i, word) in bits.iter_mut().enumerate() {
            *word = op(self.bits[i], other.bits[i]);
        }

        Self { bits }
    }

    /// Columns in ascending bit order.
    pub fn iter(&self) -> impl Iterator<Item = ColumnId> + '_ {
        (0..Self::CAPACITY)
            .filter(|i| (self.bits[i / 64] & (1 << (i % 64))) != 0)
            .filter_map(|i| u16::try_from(i).ok())
            .map(ColumnId::from_bit)
    }

    /// Position of `column` among the set bits, i.e. its slot in a
    /// coordinate vector laid out in bit order.
    #[must_use]
    pub fn position(&self, column: ColumnId) -> Option<usize> {
        if !self.get(column) {
            return None;
        }

        Some(self.iter().take_while(|c| *c != column).count())
    }
}

impl fmt::Debug for BitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for BitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits: Vec<String> = self.iter().map(|c| c.index().to_string()).collect();
        write!(f, "{{{}}}", bits.join(","))
    }
}

impl FromIterator<ColumnId> for BitKey {
    fn from_iter<I: IntoIterator<Item = ColumnId>>(iter: I) -> Self {
        Self::from_columns(iter)
    }
}
