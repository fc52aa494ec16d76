use crate::{
    predicate::ValueSet,
    schema::ColumnId,
    segment::{SegmentHeader, SegmentId},
    value::Value,
};
use std::collections::BTreeMap;

///
/// CellKey
///
/// Coordinates of one cell, one value per grouped column in bit order.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CellKey(Vec<Value>);

impl CellKey {
    #[must_use]
    pub const fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

///
/// SegmentWithData
///
/// A header plus its loaded cells. Cells absent from the map but held by
/// the header are empty (the fact table had no rows there).
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SegmentWithData {
    header: SegmentHeader,
    cells: BTreeMap<CellKey, Value>,
}

impl SegmentWithData {
    #[must_use]
    pub const fn new(header: SegmentHeader, cells: BTreeMap<CellKey, Value>) -> Self {
        Self { header, cells }
    }

    #[must_use]
    pub const fn header(&self) -> &SegmentHeader {
        &self.header
    }

    #[must_use]
    pub fn id(&self) -> SegmentId {
        self.header.unique_id()
    }

    #[must_use]
    pub const fn cells(&self) -> &BTreeMap<CellKey, Value> {
        &self.cells
    }

    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Cell at `coordinates`: `Some(None)` when held but empty, `None` when
    /// the segment does not hold that point.
    #[must_use]
    pub fn cell(&self, coordinates: &[Value]) -> Option<Option<&Value>> {
        if !self.header.holds(coordinates) {
            return None;
        }

        Some(self.cells.get(coordinates))
    }

    /// Narrow `column` by `region`, dropping the cells it covered.
    /// Returns false when the column has no values left.
    pub(crate) fn narrow(&mut self, column: ColumnId, region: &ValueSet) -> bool {
        let Some(position) = self.header.bitkey().position(column) else {
            return true;
        };
        let Some(col) = self.header.column_mut(column) else {
            return true;
        };
        if !col.narrow(region) {
            return false;
        }

        self.cells
            .retain(|key, _| key.0.get(position).is_none_or(|v| !region.contains(v)));

        true
    }
}

impl std::borrow::Borrow<[Value]> for CellKey {
    fn borrow(&self) -> &[Value] {
        &self.0
    }
}

///
/// SegmentMap
///
/// Segments produced by one load, in production order.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SegmentMap {
    segments: Vec<SegmentWithData>,
}

impl SegmentMap {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    pub fn insert(&mut self, segment: SegmentWithData) {
        if let Some(slot) = self
            .segments
            .iter_mut()
            .find(|s| s.header() == segment.header())
        {
            *slot = segment;
        } else {
            self.segments.push(segment);
        }
    }

    pub fn extend(&mut self, other: Self) {
        for segment in other.segments {
            self.insert(segment);
        }
    }

    #[must_use]
    pub fn get(&self, header: &SegmentHeader) -> Option<&SegmentWithData> {
        self.segments.iter().find(|s| s.header() == header)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SegmentWithData> {
        self.segments.iter()
    }
}

impl IntoIterator for SegmentMap {
    type Item = SegmentWithData;
    type IntoIter = std::vec::IntoIter<SegmentWithData>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.into_iter()
    }
}
