use crate::{
    batch::Batch,
    bitkey::BitKey,
    error::InternalError,
    schema::MeasureId,
    segment::{CellKey, SegmentColumn, SegmentHeader, SegmentMap, SegmentWithData},
    sql::{
        Dialect, Row, RowShape, ShapeColumn, SqlError, SqlExecutor, SqlStatement, StatementSpec,
        build_statement,
    },
    value::Value,
};
use std::collections::{BTreeMap, BTreeSet};

///
/// LoadOptions
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LoadOptions {
    /// Allow GROUPING SETS when the dialect supports them.
    pub grouping_sets: bool,
    pub formatted_sql: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            grouping_sets: true,
            formatted_sql: false,
        }
    }
}

///
/// CompositeBatch
///
/// One detail batch plus the summary batches it answers. Loads all of
/// them in one GROUPING SETS statement where possible, otherwise one
/// statement per batch; either way the result is all-or-nothing.
///

#[derive(Clone, Debug)]
pub struct CompositeBatch {
    detail: Batch,
    summaries: Vec<Batch>,
}

impl CompositeBatch {
    pub(crate) const fn new(detail: Batch, summaries: Vec<Batch>) -> Self {
        Self { detail, summaries }
    }

    #[must_use]
    pub const fn detail(&self) -> &Batch {
        &self.detail
    }

    #[must_use]
    pub fn summaries(&self) -> &[Batch] {
        &self.summaries
    }

    fn batches(&self) -> impl Iterator<Item = &Batch> {
        std::iter::once(&self.detail).chain(self.summaries.iter())
    }

    #[must_use]
    pub fn uses_grouping_sets(&self, dialect: &dyn Dialect, options: LoadOptions) -> bool {
        !self.summaries.is_empty() && options.grouping_sets && dialect.supports_grouping_sets()
    }

    #[must_use]
    pub fn statement_count(&self, dialect: &dyn Dialect, options: LoadOptions) -> usize {
        if self.uses_grouping_sets(dialect, options) {
            1
        } else {
            1 + self.summaries.len()
        }
    }

    /// Statements a load would issue, in issue order.
    pub fn statements(
        &self,
        dialect: &dyn Dialect,
        options: LoadOptions,
    ) -> Result<Vec<SqlStatement>, InternalError> {
        let schema = self.detail.schema();

        if self.uses_grouping_sets(dialect, options) {
            let measures: BTreeSet<MeasureId> = self
                .batches()
                .flat_map(|b| b.measures().iter().copied())
                .collect();
            let grains: Vec<BitKey> = self.batches().map(Batch::bitkey).collect();
            let spec = StatementSpec {
                star: self.detail.star(),
                columns: self.detail.value_sets(),
                measures: &measures,
                compound: self.detail.key().compound(),
                grouping_sets: Some(&grains),
                formatted: options.formatted_sql,
            };

            return Ok(vec![build_statement(schema, dialect, &spec)?]);
        }

        self.batches()
            .map(|batch| {
                let spec = StatementSpec {
                    star: batch.star(),
                    columns: batch.value_sets(),
                    measures: batch.measures(),
                    compound: batch.key().compound(),
                    grouping_sets: None,
                    formatted: options.formatted_sql,
                };
                build_statement(schema, dialect, &spec)
            })
            .collect()
    }

    /// Run the statements and build one segment per (grain, measure).
    /// Any failure discards every segment of the composite.
    pub fn load(
        &self,
        dialect: &dyn Dialect,
        executor: &dyn SqlExecutor,
        options: LoadOptions,
    ) -> Result<SegmentMap, InternalError> {
        let statements = self.statements(dialect, options)?;
        let grouped = self.uses_grouping_sets(dialect, options);

        let mut results = Vec::with_capacity(statements.len());
        for statement in &statements {
            tracing::trace!(sql = %statement.sql, "issuing aggregate statement");
            results.push(executor.execute(statement)?);
        }

        let mut map = SegmentMap::new();
        if grouped {
            let Some(rows) = results.first() else {
                return Err(InternalError::batch_invariant("grouping sets load produced no result"));
            };
            let grains: Vec<&Batch> = self.batches().collect();
            let mut cells = vec![CellSink::default(); grains.len()];
            for row in rows {
                let slot = grain_of(row, &statements[0].shape, &grains)?;
                cells[slot].accept(row, &statements[0].shape, grains[slot])?;
            }
            for (batch, sink) in grains.into_iter().zip(cells) {
                sink.into_segments(batch, &mut map);
            }
        } else {
            for ((batch, rows), statement) in self.batches().zip(&results).zip(&statements) {
                let mut sink = CellSink::default();
                for row in rows {
                    sink.accept(row, &statement.shape, batch)?;
                }
                sink.into_segments(batch, &mut map);
            }
        }

        Ok(map)
    }
}

// Index into `grains` of the batch a grouping-sets row belongs to.
fn grain_of(row: &Row, shape: &RowShape, grains: &[&Batch]) -> Result<usize, InternalError> {
    check_width(row, shape)?;

    let mut grain = grains.first().map(|b| b.bitkey()).unwrap_or_default();
    for (position, column) in shape.columns().iter().enumerate() {
        let ShapeColumn::Grouping(column) = column else {
            continue;
        };
        match &row[position] {
            Value::Int(1) | Value::Bool(true) => grain.clear(*column),
            Value::Int(0) | Value::Bool(false) => {}
            other => {
                return Err(SqlError::BadGroupingFlag {
                    value: other.clone(),
                }
                .into());
            }
        }
    }

    grains
        .iter()
        .position(|b| b.bitkey() == grain)
        .ok_or_else(|| SqlError::UnknownGrain.into())
}

fn check_width(row: &Row, shape: &RowShape) -> Result<(), InternalError> {
    if row.len() == shape.len() {
        Ok(())
    } else {
        Err(SqlError::ShapeMismatch {
            expected: shape.len(),
            actual: row.len(),
        }
        .into())
    }
}

///
/// CellSink
///
/// Accumulates the cells of one grain, per measure.
///

#[derive(Clone, Debug, Default)]
struct CellSink {
    cells: BTreeMap<MeasureId, BTreeMap<CellKey, Value>>,
}

impl CellSink {
    fn accept(&mut self, row: &Row, shape: &RowShape, batch: &Batch) -> Result<(), InternalError> {
        check_width(row, shape)?;

        let mut key = Vec::with_capacity(batch.bitkey().cardinality());
        for column in batch.bitkey().iter() {
            let position = shape.position(ShapeColumn::Key(column)).ok_or_else(|| {
                InternalError::batch_invariant(format!("statement does not select {column}"))
            })?;
            key.push(row[position].clone());
        }
        for measure in batch.measures() {
            let position = shape.position(ShapeColumn::Measure(*measure)).ok_or_else(|| {
                InternalError::batch_invariant(format!("statement does not select {measure}"))
            })?;
            if row[position].is_null() {
                continue;
            }
            self.cells
                .entry(*measure)
                .or_default()
                .insert(CellKey::new(key.clone()), row[position].clone());
        }

        Ok(())
    }

    fn into_segments(mut self, batch: &Batch, map: &mut SegmentMap) {
        for measure in batch.measures() {
            let columns = batch
                .bitkey()
                .iter()
                .map(|column| {
                    batch.value_set(column).map_or_else(
                        || SegmentColumn::unconstrained(column),
                        |values| SegmentColumn::constrained(column, values.clone()),
                    )
                })
                .collect();
            let header = SegmentHeader::new(
                *measure,
                batch.star(),
                columns,
                batch.key().compound().to_vec(),
            );
            let mut cells = self.cells.remove(measure).unwrap_or_default();
            cells.retain(|key, _| header.holds(key.values()));

            map.insert(SegmentWithData::new(header, cells));
        }
    }
}
