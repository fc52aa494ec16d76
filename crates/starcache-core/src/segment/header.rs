use crate::{
    bitkey::BitKey,
    predicate::{StarPredicate, ValueSet},
    schema::{Column, ColumnId, MeasureId, Schema, StarId},
    value::Value,
};
use sha2::{Digest, Sha256};
use std::fmt;

///
/// SegmentId
///
/// SHA-256 digest of a header's canonical description.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SegmentId([u8; 32]);

impl SegmentId {
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }

        Ok(())
    }
}

///
/// Coverage
///
/// How much of one stored column a region's value set reaches.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Coverage {
    None,

    /// `removed` is the number of stored values a narrow would drop;
    /// `usize::MAX` when ranges or an unconstrained column are involved.
    Partial { removed: usize },
    Full,
}

///
/// SegmentColumn
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SegmentColumn {
    pub column: ColumnId,

    /// `None` when the segment holds every value of the column.
    pub values: Option<ValueSet>,

    /// Values removed by partial flushes that `values` cannot express.
    pub excluded: ValueSet,
}

impl SegmentColumn {
    #[must_use]
    pub fn constrained(column: ColumnId, values: ValueSet) -> Self {
        Self {
            column,
            values: Some(values),
            excluded: ValueSet::new(),
        }
    }

    #[must_use]
    pub fn unconstrained(column: ColumnId) -> Self {
        Self {
            column,
            values: None,
            excluded: ValueSet::new(),
        }
    }

    #[must_use]
    pub fn allows(&self, value: &Value) -> bool {
        self.values.as_ref().is_none_or(|v| v.contains(value)) && !self.excluded.contains(value)
    }

    #[must_use]
    pub fn coverage(&self, region: &ValueSet) -> Coverage {
        let effective = region.without(&self.excluded);
        if effective.is_empty() {
            return Coverage::None;
        }
        let Some(allowed) = &self.values else {
            return Coverage::Partial {
                removed: usize::MAX,
            };
        };

        let live = allowed.without(&self.excluded);
        let hits = live
            .values()
            .iter()
            .filter(|v| effective.contains(v))
            .count();
        let range_hit = live.ranges().iter().any(|r| {
            effective.ranges().iter().any(|e| e.overlaps(r))
                || effective.values().iter().any(|v| r.contains(v))
        });

        let every_value = hits == live.value_count();
        let every_range = live.ranges().iter().all(|r| effective.contains_range(r));
        if every_value && every_range {
            Coverage::Full
        } else if hits == 0 && !range_hit {
            Coverage::None
        } else if range_hit {
            Coverage::Partial {
                removed: usize::MAX,
            }
        } else {
            Coverage::Partial { removed: hits }
        }
    }

    /// Remove `region` from the column. Returns false when nothing is left.
    pub fn narrow(&mut self, region: &ValueSet) -> bool {
        match &mut self.values {
            None => {
                self.excluded.extend(region);
                true
            }
            Some(allowed) => {
                allowed.remove_covered_by(region);
                if allowed.has_ranges() {
                    self.excluded.extend(region);
                }

                !allowed.is_empty()
            }
        }
    }
}

///
/// SegmentHeader
///
/// Identity of one cached aggregate: a measure at one grain, with the
/// values held for each grouped column. Columns are kept in bit order.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SegmentHeader {
    measure: MeasureId,
    star: StarId,
    bitkey: BitKey,
    columns: Vec<SegmentColumn>,
    compound: Vec<StarPredicate>,
}

impl SegmentHeader {
    #[must_use]
    pub fn new(
        measure: MeasureId,
        star: StarId,
        mut columns: Vec<SegmentColumn>,
        compound: Vec<StarPredicate>,
    ) -> Self {
        columns.sort_by_key(|c| c.column);
        let bitkey = BitKey::from_columns(columns.iter().map(|c| c.column));

        Self {
            measure,
            star,
            bitkey,
            columns,
            compound,
        }
    }

    #[must_use]
    pub const fn measure(&self) -> MeasureId {
        self.measure
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
    pub fn columns(&self) -> &[SegmentColumn] {
        &self.columns
    }

    #[must_use]
    pub fn compound(&self) -> &[StarPredicate] {
        &self.compound
    }

    #[must_use]
    pub fn column(&self, column: ColumnId) -> Option<&SegmentColumn> {
        self.columns.iter().find(|c| c.column == column)
    }

    pub(crate) fn column_mut(&mut self, column: ColumnId) -> Option<&mut SegmentColumn> {
        self.columns.iter_mut().find(|c| c.column == column)
    }

    /// True when the header holds the cell at `coordinates` (bit order).
    #[must_use]
    pub fn holds(&self, coordinates: &[Value]) -> bool {
        coordinates.len() == self.columns.len()
            && self
                .columns
                .iter()
                .zip(coordinates)
                .all(|(c, v)| c.allows(v))
    }

    #[must_use]
    pub fn unique_id(&self) -> SegmentId {
        let mut hasher = Sha256::new();
        hasher.update(b"segment:v1");
        write_str(&mut hasher, &self.to_string());

        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);

        SegmentId(out)
    }

    /// Multi-line description with schema names, used by cache reports.
    #[must_use]
    pub fn describe(&self, schema: &Schema) -> String {
        let measure = schema
            .measure(self.measure)
            .map_or_else(|| self.measure.to_string(), |m| m.name.clone());
        let mut out = format!("Segment #{}\nmeasure=[{measure}]\n", self.unique_id());

        for col in &self.columns {
            let name = schema
                .column(col.column)
                .map_or_else(|| col.column.to_string(), Column::qualified_name);
            match &col.values {
                Some(values) => out.push_str(&format!("{name}={values}\n")),
                None => out.push_str(&format!("{name}=*\n")),
            }
            if !col.excluded.is_empty() {
                out.push_str(&format!("{name} excludes {}\n", col.excluded));
            }
        }
        for predicate in &self.compound {
            out.push_str(&format!("compound {predicate}\n"));
        }

        out
    }
}

impl fmt::Display for SegmentHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}{}", self.measure, self.star, self.bitkey)?;
        for col in &self.columns {
            match &col.values {
                Some(values) => write!(f, " {}={values}", col.column)?,
                None => write!(f, " {}=*", col.column)?,
            }
            if !col.excluded.is_empty() {
                write!(f, "-{}", col.excluded)?;
            }
        }
        for predicate in &self.compound {
            write!(f, " [{predicate}]")?;
        }

        Ok(())
    }
}

fn write_str(hasher: &mut Sha256, value: &str) {
    let len = u32::try_from(value.len()).unwrap_or(u32::MAX);
    hasher.update(len.to_be_bytes());
    hasher.update(value.as_bytes());
}
