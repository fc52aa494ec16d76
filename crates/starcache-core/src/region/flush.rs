use crate::{
    bitkey::BitKey,
    error::{ErrorClass, ErrorOrigin, InternalError},
    member::Member,
    predicate::{RangeBound, ValueRange, ValueSet},
    region::{CellRegion, RangeRegion, RegionError, build::range_bound},
    schema::{ColumnId, DimensionId, MeasureId, Schema},
    segment::{Coverage, SegmentHeader, SegmentIndex, SegmentWithData},
    value::Value,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    ops::{Add, AddAssign, Bound},
};

///
/// FlushReport
///
/// Per-segment outcome counts of one flush. A segment narrowed by one
/// conjunct and discarded by another counts as discarded.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FlushReport {
    pub discarded: usize,
    pub narrowed: usize,
    pub untouched: usize,
}

impl FlushReport {
    #[must_use]
    pub const fn changed(&self) -> usize {
        self.discarded + self.narrowed
    }
}

impl Add for FlushReport {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            discarded: self.discarded + rhs.discarded,
            narrowed: self.narrowed + rhs.narrowed,
            untouched: self.untouched + rhs.untouched,
        }
    }
}

impl AddAssign for FlushReport {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl fmt::Display for FlushReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "discarded={} narrowed={} untouched={}",
            self.discarded, self.narrowed, self.untouched
        )
    }
}

///
/// Restriction
///
/// One conjunct of a normalized region, resolved to columns: the measures
/// it applies to, the values it pins per column, and the deeper-level
/// columns whose presence exempts a segment (member without descendants).
///

#[derive(Clone, Debug, Eq, PartialEq)]
struct Restriction {
    measures: BTreeSet<MeasureId>,
    columns: BTreeMap<ColumnId, ValueSet>,
    skip_deeper: BitKey,
}

enum Action {
    Untouched,
    Discard,
    Narrow(ColumnId),
}

impl Restriction {
    fn action(&self, header: &SegmentHeader) -> Action {
        if !self.measures.contains(&header.measure())
            || header.bitkey().intersects(&self.skip_deeper)
        {
            return Action::Untouched;
        }
        if self.columns.is_empty() {
            return Action::Discard;
        }

        // partial column with the fewest removed values; ties go to the
        // lowest column id
        let mut narrowest: Option<(usize, ColumnId)> = None;
        let mut shared = false;
        for (column, values) in &self.columns {
            let Some(stored) = header.column(*column) else {
                continue;
            };
            shared = true;
            match stored.coverage(values) {
                Coverage::None => return Action::Untouched,
                Coverage::Full => {}
                Coverage::Partial { removed } => {
                    if narrowest.is_none_or(|(best, _)| removed < best) {
                        narrowest = Some((removed, *column));
                    }
                }
            }
        }

        // compound predicates cannot be narrowed
        let compound_hit = header
            .compound()
            .iter()
            .any(|p| self.columns.keys().any(|c| p.columns().get(*c)));
        if compound_hit {
            return Action::Discard;
        }
        if !shared {
            return Action::Untouched;
        }

        match narrowest {
            Some((_, column)) => Action::Narrow(column),
            None => Action::Discard,
        }
    }
}

///
/// FlushPlan
///
/// A region resolved against the schema into column restrictions, ready
/// to be applied to a segment index by the serializing executor.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FlushPlan {
    restrictions: Vec<Restriction>,
}

impl FlushPlan {
    /// Plan a flush of `region`, which must include the measures dimension.
    pub fn new(schema: &Schema, region: &CellRegion) -> Result<Self, InternalError> {
        if !region.dimensionality().contains(&DimensionId::MEASURES) {
            return Err(RegionError::MissingMeasures {
                dimensionality: schema.describe_dimensionality(&region.dimensionality()),
            }
            .into());
        }

        Self::resolve(schema, region)
    }

    /// Plan for inspecting `region`; without a measures component every
    /// measure is included.
    pub fn inspect(schema: &Schema, region: &CellRegion) -> Result<Self, InternalError> {
        if region.dimensionality().contains(&DimensionId::MEASURES) {
            return Self::resolve(schema, region);
        }
        let region = CellRegion::crossjoin(
            schema,
            vec![CellRegion::all_measures(schema), region.clone()],
        )?;

        Self::resolve(schema, &region)
    }

    fn resolve(schema: &Schema, region: &CellRegion) -> Result<Self, InternalError> {
        let normalized = region.normalize();
        let conjuncts: Vec<&[CellRegion]> = match &normalized {
            CellRegion::Union(u) => u
                .children()
                .iter()
                .map(|c| match c {
                    CellRegion::Crossjoin(x) => x.children(),
                    leaf => std::slice::from_ref(leaf),
                })
                .collect(),
            leaf => vec![std::slice::from_ref(leaf)],
        };

        let mut restrictions = Vec::new();
        for leaves in conjuncts {
            let mut measures = BTreeSet::new();
            let mut partials = vec![Partial::default()];
            for leaf in leaves {
                let alternatives = match leaf {
                    CellRegion::Measures(m) => {
                        measures.extend(m.measures().iter().copied());
                        continue;
                    }
                    CellRegion::Member(m) => m
                        .members()
                        .iter()
                        .map(|member| Partial::member(schema, member, m.descendants()))
                        .collect::<Result<Vec<_>, _>>()?,
                    CellRegion::Range(r) => Partial::range(schema, r)?,
                    CellRegion::Union(_) | CellRegion::Crossjoin(_) => {
                        return Err(InternalError::new(
                            ErrorClass::InvariantViolation,
                            ErrorOrigin::Region,
                            "normalized region has a nested union or crossjoin",
                        ));
                    }
                };
                partials = partials
                    .iter()
                    .flat_map(|p| alternatives.iter().map(move |alt| p.join(alt)))
                    .collect();
            }

            restrictions.extend(partials.into_iter().map(|p| Restriction {
                measures: measures.clone(),
                columns: p.columns,
                skip_deeper: p.skip_deeper,
            }));
        }

        Ok(Self { restrictions })
    }

    /// Append another plan's restrictions; the result flushes both regions.
    pub fn merge(&mut self, other: Self) {
        self.restrictions.extend(other.restrictions);
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.restrictions.is_empty()
    }

    /// True when applying the plan would discard or narrow `header`.
    #[must_use]
    pub fn touches(&self, header: &SegmentHeader) -> bool {
        self.restrictions
            .iter()
            .any(|r| !matches!(r.action(header), Action::Untouched))
    }

    /// Apply every restriction to every segment. Segments are visited in
    /// index order; restrictions in plan order.
    pub(crate) fn apply(&self, index: &mut SegmentIndex) -> FlushReport {
        let mut report = FlushReport::default();
        let mut discard = Vec::with_capacity(index.len());
        let mut replacements = Vec::new();

        for (position, segment) in index.iter().enumerate() {
            let mut narrowed: Option<SegmentWithData> = None;
            let mut discarded = false;

            for restriction in &self.restrictions {
                let header = narrowed.as_ref().map_or(segment.header(), |s| s.header());
                match restriction.action(header) {
                    Action::Untouched => {}
                    Action::Discard => discarded = true,
                    Action::Narrow(column) => {
                        let copy = narrowed.get_or_insert_with(|| SegmentWithData::clone(segment));
                        let values = &restriction.columns[&column];
                        discarded = !copy.narrow(column, values);
                    }
                }
                if discarded {
                    break;
                }
            }

            discard.push(discarded);
            if discarded {
                report.discarded += 1;
            } else if let Some(segment) = narrowed {
                report.narrowed += 1;
                replacements.push((position, segment));
            } else {
                report.untouched += 1;
            }
        }

        for (position, segment) in replacements {
            index.replace(position, segment);
        }
        index.retain_indexed(|i| !discard[i]);

        report
    }
}

///
/// Partial
///
/// Column values pinned by some of a conjunct's leaves.
///

#[derive(Clone, Debug, Default)]
struct Partial {
    columns: BTreeMap<ColumnId, ValueSet>,
    skip_deeper: BitKey,
}

impl Partial {
    fn member(schema: &Schema, member: &Member, descendants: bool) -> Result<Self, InternalError> {
        let columns = member
            .column_values(schema)?
            .into_iter()
            .map(|(column, value)| (column, ValueSet::from_values([value])))
            .collect();
        let skip_deeper = if descendants {
            BitKey::new()
        } else {
            schema.deeper_level_columns(member.level())
        };

        Ok(Self {
            columns,
            skip_deeper,
        })
    }

    /// Restrictions covering a range region. Bounds compare by their key
    /// paths from the root, so a range spanning parents becomes the tail
    /// under the lower parent, whole parents in between, and the head
    /// under the upper parent.
    fn range(schema: &Schema, region: &RangeRegion) -> Result<Vec<Self>, InternalError> {
        let level = schema.resolve_level(region.level())?;
        let parent_child = schema.resolve_hierarchy(level.hierarchy)?.parent_child;
        let lower = bound_path(schema, region.lower())?;
        let upper = bound_path(schema, region.upper())?;

        let path = match (lower.as_ref().or(upper.as_ref()), parent_child) {
            (Some(path), false) if !path.0.is_empty() => path,
            _ => {
                let range =
                    ValueRange::new(range_bound(region.lower()), range_bound(region.upper()))?;
                return Ok(vec![Self::pinned(&[], region.column(), range)]);
            }
        };
        let last = path.0.len() - 1;

        // columns both bounds agree on, never the level's own column
        let shared = match (&lower, &upper) {
            (Some(lo), Some(hi)) => lo
                .0
                .iter()
                .zip(&hi.0)
                .take(last)
                .take_while(|(a, b)| a == b)
                .count(),
            _ => 0,
        };
        let prefix = &path.0[..shared];
        let (column, _) = &path.0[shared];

        if shared == last {
            let range = ValueRange::new(
                side_bound(lower.as_ref(), shared, last),
                side_bound(upper.as_ref(), shared, last),
            )?;
            return Ok(vec![Self::pinned(prefix, *column, range)]);
        }

        let mut partials = Vec::new();
        if let Some(lo) = &lower {
            for depth in shared + 1..=last {
                let range = ValueRange::new(side_bound(Some(lo), depth, last), RangeBound::Unbounded)?;
                partials.push(Self::pinned(&lo.0[..depth], lo.0[depth].0, range));
            }
        }
        let between = ValueRange::new(
            lower
                .as_ref()
                .map_or(RangeBound::Unbounded, |lo| RangeBound::Exclusive(lo.0[shared].1.clone())),
            upper
                .as_ref()
                .map_or(RangeBound::Unbounded, |hi| RangeBound::Exclusive(hi.0[shared].1.clone())),
        )?;
        partials.push(Self::pinned(prefix, *column, between));
        if let Some(hi) = &upper {
            for depth in shared + 1..=last {
                let range = ValueRange::new(RangeBound::Unbounded, side_bound(Some(hi), depth, last))?;
                partials.push(Self::pinned(&hi.0[..depth], hi.0[depth].0, range));
            }
        }

        Ok(partials)
    }

    fn pinned(pins: &[(ColumnId, Value)], column: ColumnId, range: ValueRange) -> Self {
        let mut columns: BTreeMap<ColumnId, ValueSet> = pins
            .iter()
            .map(|(c, v)| (*c, ValueSet::from_values([v.clone()])))
            .collect();
        columns.insert(column, ValueSet::from_range(range));

        Self {
            columns,
            skip_deeper: BitKey::new(),
        }
    }

    fn join(&self, other: &Self) -> Self {
        let mut columns = self.columns.clone();
        for (column, values) in &other.columns {
            columns.entry(*column).or_insert_with(|| values.clone());
        }

        Self {
            columns,
            skip_deeper: self.skip_deeper.or(&other.skip_deeper),
        }
    }
}

///
/// BoundPath
///
/// Key path of one range bound, and whether the bound is inclusive.
///

struct BoundPath(Vec<(ColumnId, Value)>, bool);

fn bound_path(schema: &Schema, bound: &Bound<Member>) -> Result<Option<BoundPath>, InternalError> {
    Ok(match bound {
        Bound::Included(m) => Some(BoundPath(m.column_path(schema)?, true)),
        Bound::Excluded(m) => Some(BoundPath(m.column_path(schema)?, false)),
        Bound::Unbounded => None,
    })
}

// Bound on the column at `depth`: the member's own inclusivity at the
// leaf column, strict above it.
fn side_bound(path: Option<&BoundPath>, depth: usize, last: usize) -> RangeBound {
    match path {
        None => RangeBound::Unbounded,
        Some(BoundPath(path, true)) if depth == last => RangeBound::Inclusive(path[depth].1.clone()),
        Some(BoundPath(path, _)) => RangeBound::Exclusive(path[depth].1.clone()),
    }
}
