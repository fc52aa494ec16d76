use crate::{
    member::Member,
    predicate::RangeBound,
    region::{
        CellRegion, CrossjoinRegion, MeasuresRegion, MemberRegion, RangeRegion, RegionError,
        UnionRegion,
    },
    schema::{DimensionId, LevelId, MeasureId, Schema},
    value::Value,
};
use std::{cmp::Ordering, ops::Bound};

impl CellRegion {
    /// Region of `members`, all from one dimension. With `descendants`
    /// the region also covers every member below them.
    pub fn member(
        schema: &Schema,
        members: &[Member],
        descendants: bool,
    ) -> Result<Self, RegionError> {
        let Some(first) = members.first() else {
            return Err(RegionError::NoMembers);
        };
        if let Some(other) = members.iter().find(|m| m.dimension() != first.dimension()) {
            return Err(RegionError::MixedDimensions {
                first: schema.describe_dimensionality(&[first.dimension()]),
                other: schema.describe_dimensionality(&[other.dimension()]),
            });
        }

        Ok(Self::Member(MemberRegion {
            dimension: first.dimension(),
            members: members.to_vec(),
            descendants,
        }))
    }

    /// Members of `level` between `lower` and `upper`, with descendants.
    /// Bounds are ordered by their ancestor keys first, so a range may
    /// span several parents.
    pub fn range(
        schema: &Schema,
        level: LevelId,
        lower: Bound<Member>,
        upper: Bound<Member>,
    ) -> Result<Self, RegionError> {
        let lvl = schema
            .level(level)
            .ok_or(RegionError::UnknownLevel { level })?;
        let column = lvl.column.ok_or_else(|| RegionError::RangeWithoutColumn {
            level: lvl.name.clone(),
        })?;
        let hierarchy = schema
            .hierarchy(lvl.hierarchy)
            .ok_or(RegionError::UnknownLevel { level })?;

        for bound in [&lower, &upper] {
            if let Bound::Included(m) | Bound::Excluded(m) = bound
                && m.level() != level
            {
                return Err(RegionError::RangeBoundLevel {
                    member: m.unique_name().to_string(),
                    level: lvl.name.clone(),
                });
            }
        }
        if let (Bound::Included(a) | Bound::Excluded(a), Bound::Included(b) | Bound::Excluded(b)) =
            (&lower, &upper)
        {
            let order = if hierarchy.parent_child {
                a.key().cmp(b.key())
            } else {
                key_path(a).cmp(&key_path(b))
            };
            let exclusive = matches!(lower, Bound::Excluded(_)) || matches!(upper, Bound::Excluded(_));
            if order == Ordering::Greater || (order == Ordering::Equal && exclusive) {
                return Err(RegionError::EmptyRange {
                    message: format!("empty range: {a} .. {b}"),
                });
            }
        }

        Ok(Self::Range(RangeRegion {
            dimension: hierarchy.dimension,
            level,
            column,
            lower,
            upper,
        }))
    }

    pub fn measures(measures: &[MeasureId]) -> Result<Self, RegionError> {
        if measures.is_empty() {
            return Err(RegionError::NoMeasures);
        }

        Ok(Self::Measures(MeasuresRegion {
            measures: measures.to_vec(),
        }))
    }

    /// Every measure of the schema.
    #[must_use]
    pub fn all_measures(schema: &Schema) -> Self {
        Self::Measures(MeasuresRegion {
            measures: schema.measures().map(|m| m.id).collect(),
        })
    }

    /// Union of regions with identical dimensionality lists.
    pub fn union(schema: &Schema, regions: Vec<Self>) -> Result<Self, RegionError> {
        let Some(first) = regions.first() else {
            return Err(RegionError::NoOperands { kind: "union" });
        };
        let dimensionality = first.dimensionality();
        for region in &regions[1..] {
            let other = region.dimensionality();
            if other != dimensionality {
                return Err(RegionError::UnionDimensionality {
                    left: schema.describe_dimensionality(&dimensionality),
                    right: schema.describe_dimensionality(&other),
                });
            }
        }

        Ok(Self::Union(UnionRegion {
            dimensionality,
            children: regions,
        }))
    }

    /// Crossjoin of regions with pairwise disjoint dimensionality.
    pub fn crossjoin(schema: &Schema, regions: Vec<Self>) -> Result<Self, RegionError> {
        if regions.is_empty() {
            return Err(RegionError::NoOperands { kind: "crossjoin" });
        }

        let mut dimensionality: Vec<DimensionId> = Vec::new();
        for region in &regions {
            let dims = region.dimensionality();
            if dims.iter().any(|d| dimensionality.contains(d)) {
                return Err(RegionError::CrossjoinDimensionality {
                    left: schema.describe_dimensionality(&dimensionality),
                    right: schema.describe_dimensionality(&dims),
                });
            }
            dimensionality.extend(dims);
        }
        dimensionality.sort_unstable();

        Ok(Self::Crossjoin(CrossjoinRegion {
            dimensionality,
            children: regions,
        }))
    }
}

// Keys from the root down to `member`.
fn key_path(member: &Member) -> Vec<&Value> {
    let mut path: Vec<&Value> = std::iter::once(member)
        .chain(member.ancestors())
        .map(Member::key)
        .collect();
    path.reverse();
    path
}

pub(super) fn range_bound(bound: &Bound<Member>) -> RangeBound {
    match bound {
        Bound::Included(m) => RangeBound::Inclusive(m.key().clone()),
        Bound::Excluded(m) => RangeBound::Exclusive(m.key().clone()),
        Bound::Unbounded => RangeBound::Unbounded,
    }
}
