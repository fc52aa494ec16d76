use crate::{
    bitkey::BitKey,
    predicate::{AggregationKey, ValueSet},
    request::CellRequest,
    schema::{ColumnId, MeasureId, Schema, StarId},
};
use derive_more::Display;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

///
/// RollupVerdict
///
/// Why a detail batch can or cannot answer a summary batch from the same
/// fact rows. Only `Compatible` allows the two to share a statement.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum RollupVerdict {
    #[display("compatible")]
    Compatible,

    #[display("different stars")]
    DifferentStar,

    #[display("detail grain does not contain summary grain")]
    NotSuperset,

    #[display("same grain")]
    SameGrain,

    #[display("detail values do not cover summary values of {column}")]
    ValuesNotCovered { column: ColumnId },

    #[display("distinct-count cannot roll up along {column}")]
    DistinctCountUnsafe { column: ColumnId },

    #[display("compound predicates differ")]
    CompoundMismatch,

    #[display("detail requests only part of {column}")]
    PartialRollupColumn { column: ColumnId },
}

impl RollupVerdict {
    #[must_use]
    pub const fn is_compatible(self) -> bool {
        matches!(self, Self::Compatible)
    }
}

///
/// Batch
///
/// All requests sharing one aggregation key. Several measures of the same
/// star may share a batch; each produces its own segment.
///

#[derive(Clone, Debug)]
pub struct Batch {
    schema: Arc<Schema>,
    key: AggregationKey,
    measures: BTreeSet<MeasureId>,
    value_sets: BTreeMap<ColumnId, ValueSet>,
    requests: usize,
}

impl Batch {
    pub(crate) fn new(schema: Arc<Schema>, key: AggregationKey) -> Self {
        Self {
            schema,
            key,
            measures: BTreeSet::new(),
            value_sets: BTreeMap::new(),
            requests: 0,
        }
    }

    pub(crate) fn add(&mut self, request: &CellRequest) {
        self.measures.insert(request.measure());
        for (column, value) in request.coordinates() {
            self.value_sets
                .entry(*column)
                .or_default()
                .insert(value.clone());
        }
        self.requests += 1;
    }

    #[must_use]
    pub const fn key(&self) -> &AggregationKey {
        &self.key
    }

    #[must_use]
    pub const fn star(&self) -> StarId {
        self.key.star()
    }

    #[must_use]
    pub const fn bitkey(&self) -> BitKey {
        self.key.bitkey()
    }

    #[must_use]
    pub const fn measures(&self) -> &BTreeSet<MeasureId> {
        &self.measures
    }

    #[must_use]
    pub const fn value_sets(&self) -> &BTreeMap<ColumnId, ValueSet> {
        &self.value_sets
    }

    #[must_use]
    pub fn value_set(&self, column: ColumnId) -> Option<&ValueSet> {
        self.value_sets.get(&column)
    }

    #[must_use]
    pub const fn request_count(&self) -> usize {
        self.requests
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// True when `summary` can be loaded from this batch's fact rows.
    #[must_use]
    pub fn can_batch(&self, summary: &Self) -> bool {
        self.rollup_verdict(summary).is_compatible()
    }

    #[must_use]
    pub fn rollup_verdict(&self, summary: &Self) -> RollupVerdict {
        if self.star() != summary.star() {
            return RollupVerdict::DifferentStar;
        }
        let detail_key = self.bitkey();
        let summary_key = summary.bitkey();
        if detail_key == summary_key {
            return RollupVerdict::SameGrain;
        }
        if !detail_key.is_superset_of(&summary_key) {
            return RollupVerdict::NotSuperset;
        }
        if self.key.compound() != summary.key.compound() {
            return RollupVerdict::CompoundMismatch;
        }

        let compound_columns = self.key.compound_columns();
        for column in summary_key.and_not(&compound_columns).iter() {
            let covered = match (self.value_set(column), summary.value_set(column)) {
                (Some(detail), Some(summary)) => detail.covers(summary),
                (_, None) => true,
                (None, Some(_)) => false,
            };
            if !covered {
                return RollupVerdict::ValuesNotCovered { column };
            }
        }

        let extra = detail_key.and_not(&summary_key);
        if let Some(column) = self.distinct_count_violation(summary, extra) {
            return RollupVerdict::DistinctCountUnsafe { column };
        }

        for column in extra.iter() {
            let Some(cardinality) = self.schema.column(column).and_then(|c| c.cardinality) else {
                continue;
            };
            let complete = self.value_set(column).is_some_and(|v| {
                !v.has_ranges() && u64::try_from(v.value_count()).is_ok_and(|n| n >= cardinality)
            });
            if !complete {
                return RollupVerdict::PartialRollupColumn { column };
            }
        }

        RollupVerdict::Compatible
    }

    // First extra column not drawn from a distinct-count measure's base table.
    fn distinct_count_violation(&self, summary: &Self, extra: BitKey) -> Option<ColumnId> {
        for measure in self.measures.iter().chain(summary.measures.iter()) {
            let Some(measure) = self.schema.measure(*measure) else {
                continue;
            };
            if !measure.aggregator.is_distinct() {
                continue;
            }
            let base_table = self.schema.column(measure.column).map(|c| c.table.as_str());
            for column in extra.iter() {
                let table = self.schema.column(column).map(|c| c.table.as_str());
                if table != base_table {
                    return Some(column);
                }
            }
        }

        None
    }
}
