//! Star-schema metadata: stars, columns, measures, and the dimension
//! hierarchy used by cache regions and member edits.
//!
//! Ids are issued by [`SchemaBuilder`] and are only meaningful against the
//! schema that issued them.

mod builder;

#[cfg(test)]
mod tests;

use crate::{bitkey::BitKey, error::InternalError};
use derive_more::Display;

pub use builder::SchemaBuilder;

///
/// CONSTANTS
///

/// Maximum number of columns across all stars of one schema.
/// Bounded by the fixed width of [`BitKey`].
pub const MAX_COLUMNS: usize = BitKey::CAPACITY;

macro_rules! schema_id {
    ($name:ident, $label:literal) => {
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        pub struct $name(u16);

        impl $name {
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", $label, self.0)
            }
        }
    };
}

schema_id!(StarId, "star");
schema_id!(ColumnId, "col");
schema_id!(MeasureId, "measure");
schema_id!(DimensionId, "dim");
schema_id!(HierarchyId, "hier");
schema_id!(LevelId, "level");

impl ColumnId {
    /// Column at bit `index` of a [`BitKey`].
    pub(crate) const fn from_bit(index: u16) -> Self {
        Self(index)
    }
}

impl DimensionId {
    /// The measures pseudo-dimension always has ordinal 0.
    pub const MEASURES: Self = Self(0);
}

///
/// TableJoin
///
/// Equi-join from the fact table to a dimension table.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableJoin {
    pub foreign_key: String,
    pub primary_key: String,
}

///
/// Table
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Table {
    pub name: String,

    /// `None` for the fact table itself.
    pub join: Option<TableJoin>,
}

///
/// Column
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Column {
    pub id: ColumnId,
    pub star: StarId,
    pub table: String,
    pub name: String,

    /// Number of distinct values, when the schema declares it.
    pub cardinality: Option<u64>,
}

impl Column {
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.table, self.name)
    }
}

///
/// Star
///
/// A fact table plus the dimension tables joined to it.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Star {
    pub id: StarId,
    pub fact_table: String,
    pub tables: Vec<Table>,
    pub columns: BitKey,
}

impl Star {
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }
}

///
/// Aggregator
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Aggregator {
    #[display("sum")]
    Sum,
    #[display("count")]
    Count,
    #[display("min")]
    Min,
    #[display("max")]
    Max,
    #[display("distinct-count")]
    DistinctCount,
}

impl Aggregator {
    #[must_use]
    pub const fn is_distinct(self) -> bool {
        matches!(self, Self::DistinctCount)
    }
}

///
/// Measure
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Measure {
    pub id: MeasureId,
    pub star: StarId,

    /// Display name, e.g. `Unit Sales`.
    pub name: String,
    pub aggregator: Aggregator,

    /// Base column the aggregator is applied to.
    pub column: ColumnId,
}

///
/// Dimension
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dimension {
    pub id: DimensionId,
    pub name: String,
    pub hierarchies: Vec<HierarchyId>,
}

///
/// Hierarchy
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Hierarchy {
    pub id: HierarchyId,
    pub dimension: DimensionId,
    pub name: String,

    /// Membership derives from a self-referencing key column; members
    /// cannot be edited in memory.
    pub parent_child: bool,
    pub levels: Vec<LevelId>,
}

///
/// Level
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Level {
    pub id: LevelId,
    pub hierarchy: HierarchyId,
    pub name: String,
    pub depth: usize,

    /// Key column; `None` for an `(All)` level.
    pub column: Option<ColumnId>,
    pub properties: Vec<String>,
}

impl Level {
    #[must_use]
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.iter().any(|p| p == name)
    }
}

///
/// Schema
///

#[derive(Clone, Debug, Default)]
pub struct Schema {
    stars: Vec<Star>,
    columns: Vec<Column>,
    measures: Vec<Measure>,
    dimensions: Vec<Dimension>,
    hierarchies: Vec<Hierarchy>,
    levels: Vec<Level>,
}

impl Schema {
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    #[must_use]
    pub fn star(&self, id: StarId) -> Option<&Star> {
        self.stars.get(id.index())
    }

    #[must_use]
    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.get(id.index())
    }

    #[must_use]
    pub fn measure(&self, id: MeasureId) -> Option<&Measure> {
        self.measures.get(id.index())
    }

    #[must_use]
    pub fn dimension(&self, id: DimensionId) -> Option<&Dimension> {
        self.dimensions.get(id.index())
    }

    #[must_use]
    pub fn hierarchy(&self, id: HierarchyId) -> Option<&Hierarchy> {
        self.hierarchies.get(id.index())
    }

    #[must_use]
    pub fn level(&self, id: LevelId) -> Option<&Level> {
        self.levels.get(id.index())
    }

    pub fn stars(&self) -> impl Iterator<Item = &Star> {
        self.stars.iter()
    }

    pub fn measures(&self) -> impl Iterator<Item = &Measure> {
        self.measures.iter()
    }

    pub(crate) fn resolve_column(&self, id: ColumnId) -> Result<&Column, InternalError> {
        self.column(id)
            .ok_or_else(|| InternalError::schema_invariant(format!("{id} is not in this schema")))
    }

    pub(crate) fn resolve_measure(&self, id: MeasureId) -> Result<&Measure, InternalError> {
        self.measure(id)
            .ok_or_else(|| InternalError::schema_invariant(format!("{id} is not in this schema")))
    }

    pub(crate) fn resolve_level(&self, id: LevelId) -> Result<&Level, InternalError> {
        self.level(id)
            .ok_or_else(|| InternalError::schema_invariant(format!("{id} is not in this schema")))
    }

    pub(crate) fn resolve_hierarchy(&self, id: HierarchyId) -> Result<&Hierarchy, InternalError> {
        self.hierarchy(id)
            .ok_or_else(|| InternalError::schema_invariant(format!("{id} is not in this schema")))
    }

    #[must_use]
    pub fn hierarchy_by_name(&self, dimension: DimensionId, name: &str) -> Option<HierarchyId> {
        self.dimension(dimension)?
            .hierarchies
            .iter()
            .copied()
            .find(|id| self.hierarchy(*id).is_some_and(|h| h.name == name))
    }

    /// Column lookup by owning table and column name.
    #[must_use]
    pub fn column_by_name(&self, table: &str, name: &str) -> Option<ColumnId> {
        self.columns
            .iter()
            .find(|c| c.table == table && c.name == name)
            .map(|c| c.id)
    }

    #[must_use]
    pub fn measure_by_name(&self, name: &str) -> Option<MeasureId> {
        self.measures.iter().find(|m| m.name == name).map(|m| m.id)
    }

    #[must_use]
    pub fn dimension_by_name(&self, name: &str) -> Option<DimensionId> {
        self.dimensions
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.id)
    }

    #[must_use]
    pub fn level_by_name(&self, hierarchy: HierarchyId, name: &str) -> Option<LevelId> {
        self.hierarchy(hierarchy)?
            .levels
            .iter()
            .copied()
            .find(|id| self.level(*id).is_some_and(|l| l.name == name))
    }

    /// Key columns of the levels strictly below `level` in its hierarchy.
    #[must_use]
    pub fn deeper_level_columns(&self, level: LevelId) -> BitKey {
        let mut key = BitKey::new();
        let Some(lvl) = self.level(level) else {
            return key;
        };
        let Some(hierarchy) = self.hierarchy(lvl.hierarchy) else {
            return key;
        };

        for id in hierarchy.levels.iter().skip(lvl.depth + 1) {
            if let Some(column) = self.level(*id).and_then(|l| l.column) {
                key.set(column);
            }
        }

        key
    }

    /// Dimension names for diagnostics, e.g. `[Measures, Time]`.
    #[must_use]
    pub fn describe_dimensionality(&self, dims: &[DimensionId]) -> String {
        let names: Vec<String> = dims
            .iter()
            .map(|id| {
                self.dimension(*id)
                    .map_or_else(|| id.to_string(), |d| d.name.clone())
            })
            .collect();

        format!("[{}]", names.join(", "))
    }
}
