//! Cache regions: a small expression language over dimension members,
//! normalized into a union of crossjoins and planned into segment flushes.

mod build;
mod flush;
mod normalize;


use crate::{
    member::Member,
    schema::{ColumnId, DimensionId, LevelId, MeasureId},
};
use std::{fmt, ops::Bound};
use thiserror::Error as ThisError;

pub use flush::{FlushPlan, FlushReport};

///
/// RegionError
///
/// Construction and flush-time rejections. Dimensionality lists are
/// rendered with dimension names for diagnostics.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum RegionError {
    #[error("union operands have different dimensionality: {left} vs {right}")]
    UnionDimensionality { left: String, right: String },

    #[error("crossjoin operands share a dimension: {left} and {right}")]
    CrossjoinDimensionality { left: String, right: String },

    #[error("{kind} region requires at least one operand")]
    NoOperands { kind: &'static str },

    #[error("member region requires at least one member")]
    NoMembers,

    #[error("member region spans dimensions {first} and {other}")]
    MixedDimensions { first: String, other: String },

    #[error("measures region requires at least one measure")]
    NoMeasures,

    #[error("{level} is not a level of this schema")]
    UnknownLevel { level: LevelId },

    #[error("level '{level}' has no key column to range over")]
    RangeWithoutColumn { level: String },

    #[error("range bound {member} is not at level '{level}'")]
    RangeBoundLevel { member: String, level: String },

    #[error("{message}")]
    EmptyRange { message: String },

    #[error("flush region must include the measures dimension, got {dimensionality}")]
    MissingMeasures { dimensionality: String },
}

///
/// CellRegion
///
/// Immutable region tree. Leaves constrain one dimension; unions and
/// crossjoins combine them under the dimensionality guards.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CellRegion {
    Member(MemberRegion),
    Range(RangeRegion),
    Measures(MeasuresRegion),
    Union(UnionRegion),
    Crossjoin(CrossjoinRegion),
}

impl CellRegion {
    /// Dimensions the region constrains. Sorted for crossjoins.
    #[must_use]
    pub fn dimensionality(&self) -> Vec<DimensionId> {
        match self {
            Self::Member(r) => vec![r.dimension],
            Self::Range(r) => vec![r.dimension],
            Self::Measures(_) => vec![DimensionId::MEASURES],
            Self::Union(r) => r.dimensionality.clone(),
            Self::Crossjoin(r) => r.dimensionality.clone(),
        }
    }

    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Member(_) | Self::Range(_) | Self::Measures(_))
    }

    /// Rewrite as a union of crossjoins of leaves. Leaves are returned
    /// unchanged; disjunct order follows the input.
    #[must_use]
    pub fn normalize(&self) -> Self {
        normalize::normalize(self)
    }
}

///
/// MemberRegion
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemberRegion {
    dimension: DimensionId,
    members: Vec<Member>,
    descendants: bool,
}

impl MemberRegion {
    #[must_use]
    pub const fn dimension(&self) -> DimensionId {
        self.dimension
    }

    #[must_use]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    #[must_use]
    pub const fn descendants(&self) -> bool {
        self.descendants
    }
}

///
/// RangeRegion
///
/// Members of one level between two bounds, with their descendants.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RangeRegion {
    dimension: DimensionId,
    level: LevelId,
    column: ColumnId,
    lower: Bound<Member>,
    upper: Bound<Member>,
}

impl RangeRegion {
    #[must_use]
    pub const fn dimension(&self) -> DimensionId {
        self.dimension
    }

    #[must_use]
    pub const fn level(&self) -> LevelId {
        self.level
    }

    #[must_use]
    pub const fn column(&self) -> ColumnId {
        self.column
    }

    #[must_use]
    pub const fn lower(&self) -> &Bound<Member> {
        &self.lower
    }

    #[must_use]
    pub const fn upper(&self) -> &Bound<Member> {
        &self.upper
    }
}

///
/// MeasuresRegion
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MeasuresRegion {
    measures: Vec<MeasureId>,
}

impl MeasuresRegion {
    #[must_use]
    pub fn measures(&self) -> &[MeasureId] {
        &self.measures
    }
}

///
/// UnionRegion
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnionRegion {
    dimensionality: Vec<DimensionId>,
    children: Vec<CellRegion>,
}

impl UnionRegion {
    #[must_use]
    pub fn children(&self) -> &[CellRegion] {
        &self.children
    }
}

///
/// CrossjoinRegion
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CrossjoinRegion {
    dimensionality: Vec<DimensionId>,
    children: Vec<CellRegion>,
}

impl CrossjoinRegion {
    #[must_use]
    pub fn children(&self) -> &[CellRegion] {
        &self.children
    }
}

impl fmt::Display for CellRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Member(r) => {
                let label = if r.descendants {
                    "MemberAndDescendants"
                } else {
                    "Member"
                };
                write!(f, "{label}(")?;
                write_list(f, &r.members)?;
                write!(f, ")")
            }
            Self::Range(r) => {
                write!(f, "Range(")?;
                match &r.lower {
                    Bound::Included(m) => write!(f, "[{m}")?,
                    Bound::Excluded(m) => write!(f, "({m}")?,
                    Bound::Unbounded => write!(f, "(*")?,
                }
                write!(f, " .. ")?;
                match &r.upper {
                    Bound::Included(m) => write!(f, "{m}]")?,
                    Bound::Excluded(m) => write!(f, "{m})")?,
                    Bound::Unbounded => write!(f, "*)")?,
                }
                write!(f, ")")
            }
            Self::Measures(r) => {
                write!(f, "Measures(")?;
                write_list(f, &r.measures)?;
                write!(f, ")")
            }
            Self::Union(r) => {
                write!(f, "Union(")?;
                write_list(f, &r.children)?;
                write!(f, ")")
            }
            Self::Crossjoin(r) => {
                write!(f, "Crossjoin(")?;
                write_list(f, &r.children)?;
                write!(f, ")")
            }
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }

    Ok(())
}
