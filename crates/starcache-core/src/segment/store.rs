use crate::{
    bitkey::BitKey,
    predicate::StarPredicate,
    request::CellRequest,
    schema::{ColumnId, MeasureId},
    segment::{SegmentHeader, SegmentId, SegmentWithData},
    value::Value,
};
use parking_lot::RwLock;
use std::{collections::BTreeMap, sync::Arc};

///
/// CellLookup
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CellLookup {
    Hit(Value),

    /// A cached segment holds the cell and it has no rows.
    Empty,
    Miss,
}

impl CellLookup {
    #[must_use]
    pub const fn is_miss(&self) -> bool {
        matches!(self, Self::Miss)
    }
}

///
/// SegmentIndex
///
/// Cached segments in installation order. Installing a segment whose header
/// equals a cached one replaces it in place.
///

#[derive(Clone, Debug, Default)]
pub struct SegmentIndex {
    segments: Vec<Arc<SegmentWithData>>,
}

impl SegmentIndex {
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<SegmentWithData>> {
        self.segments.iter()
    }

    #[must_use]
    pub fn get(&self, id: SegmentId) -> Option<&Arc<SegmentWithData>> {
        self.segments.iter().find(|s| s.id() == id)
    }

    #[must_use]
    pub fn lookup(
        &self,
        measure: MeasureId,
        coordinates: &BTreeMap<ColumnId, Value>,
        compound: &[StarPredicate],
    ) -> CellLookup {
        let bitkey = BitKey::from_columns(coordinates.keys().copied());
        let point: Vec<Value> = coordinates.values().cloned().collect();

        for segment in &self.segments {
            let header = segment.header();
            if header.measure() != measure
                || header.bitkey() != bitkey
                || header.compound() != compound
            {
                continue;
            }
            match segment.cell(&point) {
                Some(Some(value)) => return CellLookup::Hit(value.clone()),
                Some(None) => return CellLookup::Empty,
                None => {}
            }
        }

        CellLookup::Miss
    }

    pub(crate) fn install(&mut self, segment: SegmentWithData) {
        let header = segment.header().clone();
        let segment = Arc::new(segment);
        match self.position(&header) {
            Some(i) => self.segments[i] = segment,
            None => self.segments.push(segment),
        }
    }

    pub(crate) fn position(&self, header: &SegmentHeader) -> Option<usize> {
        self.segments.iter().position(|s| s.header() == header)
    }

    pub(crate) fn replace(&mut self, index: usize, segment: SegmentWithData) {
        self.segments[index] = Arc::new(segment);
    }

    /// Keep only the segments for which `keep` returns true.
    pub(crate) fn retain_indexed(&mut self, mut keep: impl FnMut(usize) -> bool) {
        let mut i = 0;
        self.segments.retain(|_| {
            let kept = keep(i);
            i += 1;
            kept
        });
    }

    pub(crate) fn clear(&mut self) -> usize {
        let count = self.segments.len();
        self.segments.clear();

        count
    }
}

///
/// SegmentStore
///
/// Copy-on-write holder for the current [`SegmentIndex`]. Readers take a
/// snapshot and never observe a partially applied mutation; mutations are
/// applied by the serializing executor only.
///

#[derive(Debug, Default)]
pub struct SegmentStore {
    index: RwLock<Arc<SegmentIndex>>,
}

impl SegmentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<SegmentIndex> {
        Arc::clone(&self.index.read())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    #[must_use]
    pub fn lookup(
        &self,
        measure: MeasureId,
        coordinates: &BTreeMap<ColumnId, Value>,
        compound: &[StarPredicate],
    ) -> CellLookup {
        self.snapshot().lookup(measure, coordinates, compound)
    }

    #[must_use]
    pub fn lookup_request(&self, request: &CellRequest) -> CellLookup {
        self.lookup(
            request.measure(),
            request.coordinates(),
            request.key().compound(),
        )
    }

    /// Apply `f` to a private copy of the index, then publish it.
    pub(crate) fn apply<R>(&self, f: impl FnOnce(&mut SegmentIndex) -> R) -> R {
        let mut guard = self.index.write();
        let mut next = SegmentIndex::clone(&guard);
        let out = f(&mut next);
        *guard = Arc::new(next);

        out
    }
}
