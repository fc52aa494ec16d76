//! SQL collaborators: dialect capabilities, statement assembly, and the
//! execution boundary.

mod builder;
mod recording;


use crate::{
    error::InternalError,
    predicate::{RangeBound, StarPredicate, ValueRange, ValueSet},
    schema::{Aggregator, ColumnId, MeasureId, Schema},
    value::Value,
};
use thiserror::Error as ThisError;

pub(crate) use builder::{StatementSpec, build_statement};
pub use recording::RecordingSqlExecutor;

///
/// Dialect
///
/// Syntax capabilities of the target database. Every method but the two
/// capability probes has a portable default.
///

pub trait Dialect: Send + Sync {
    /// Tag naming the database product, e.g. `postgres`.
    fn database_product(&self) -> &str;

    fn supports_grouping_sets(&self) -> bool;

    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn quote_column(&self, table: &str, column: &str) -> String {
        format!(
            "{}.{}",
            self.quote_identifier(table),
            self.quote_identifier(column)
        )
    }

    fn quote_literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "null".to_string(),
            Value::Bool(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Text(v) => format!("'{}'", v.replace('\'', "''")),
        }
    }

    fn aggregate(&self, aggregator: Aggregator, expr: &str) -> String {
        match aggregator {
            Aggregator::Sum => format!("sum({expr})"),
            Aggregator::Count => format!("count({expr})"),
            Aggregator::Min => format!("min({expr})"),
            Aggregator::Max => format!("max({expr})"),
            Aggregator::DistinctCount => format!("count(distinct {expr})"),
        }
    }

    /// WHERE fragment for a predicate tree.
    fn lower_predicate(
        &self,
        schema: &Schema,
        predicate: &StarPredicate,
    ) -> Result<String, InternalError> {
        match predicate {
            StarPredicate::Value(p) => {
                let column = self.column_expr(schema, p.column)?;
                if p.value.is_null() {
                    Ok(format!("{column} is null"))
                } else {
                    Ok(format!("{column} = {}", self.quote_literal(&p.value)))
                }
            }
            StarPredicate::Range(p) => {
                let column = self.column_expr(schema, p.column)?;
                Ok(self.lower_range(&column, &p.range))
            }
            StarPredicate::And(p) => {
                let parts = p
                    .children()
                    .iter()
                    .map(|c| self.lower_predicate(schema, c))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("({})", parts.join(" and ")))
            }
            StarPredicate::Or(p) => {
                let parts = p
                    .children()
                    .iter()
                    .map(|c| self.lower_predicate(schema, c))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("({})", parts.join(" or ")))
            }
        }
    }

    fn lower_range(&self, column: &str, range: &ValueRange) -> String {
        let mut terms = Vec::with_capacity(2);
        match range.lower() {
            RangeBound::Unbounded => {}
            RangeBound::Inclusive(v) => terms.push(format!("{column} >= {}", self.quote_literal(v))),
            RangeBound::Exclusive(v) => terms.push(format!("{column} > {}", self.quote_literal(v))),
        }
        match range.upper() {
            RangeBound::Unbounded => {}
            RangeBound::Inclusive(v) => terms.push(format!("{column} <= {}", self.quote_literal(v))),
            RangeBound::Exclusive(v) => terms.push(format!("{column} < {}", self.quote_literal(v))),
        }

        if terms.is_empty() {
            "1 = 1".to_string()
        } else {
            terms.join(" and ")
        }
    }

    /// WHERE fragment admitting exactly the members of `values`.
    fn lower_value_set(&self, column: &str, values: &ValueSet) -> String {
        let mut terms = Vec::new();
        let literals: Vec<String> = values
            .values()
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| self.quote_literal(v))
            .collect();
        match literals.len() {
            0 => {}
            1 => terms.push(format!("{column} = {}", literals[0])),
            _ => terms.push(format!("{column} in ({})", literals.join(", "))),
        }
        if values.values().iter().any(Value::is_null) {
            terms.push(format!("{column} is null"));
        }
        for range in values.ranges() {
            terms.push(format!("({})", self.lower_range(column, range)));
        }

        match terms.len() {
            0 => "1 = 0".to_string(),
            1 => terms.remove(0),
            _ => format!("({})", terms.join(" or ")),
        }
    }

    fn column_expr(&self, schema: &Schema, column: ColumnId) -> Result<String, InternalError> {
        let column = schema.resolve_column(column)?;
        Ok(self.quote_column(&column.table, &column.name))
    }
}

///
/// GenericDialect
///
/// ANSI quoting with a switchable grouping-sets capability.
///

#[derive(Clone, Debug)]
pub struct GenericDialect {
    product: String,
    grouping_sets: bool,
}

impl GenericDialect {
    #[must_use]
    pub fn new(product: &str, grouping_sets: bool) -> Self {
        Self {
            product: product.to_string(),
            grouping_sets,
        }
    }
}

impl Default for GenericDialect {
    fn default() -> Self {
        Self::new("generic", true)
    }
}

impl Dialect for GenericDialect {
    fn database_product(&self) -> &str {
        &self.product
    }

    fn supports_grouping_sets(&self) -> bool {
        self.grouping_sets
    }
}

///
/// ShapeColumn
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ShapeColumn {
    Key(ColumnId),
    Measure(MeasureId),

    /// `grouping(col)` indicator: 1 when the row rolls `col` up.
    Grouping(ColumnId),
}

///
/// RowShape
///
/// Describes each position of a result row.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RowShape {
    columns: Vec<ShapeColumn>,
}

impl RowShape {
    pub(crate) fn push(&mut self, column: ShapeColumn) -> usize {
        self.columns.push(column);
        self.columns.len() - 1
    }

    #[must_use]
    pub fn columns(&self) -> &[ShapeColumn] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[must_use]
    pub fn position(&self, column: ShapeColumn) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }
}

///
/// SqlStatement
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub shape: RowShape,
}

/// One result row, positioned by the statement's [`RowShape`].
pub type Row = Vec<Value>;

///
/// SqlExecutor
///
/// Runs statements against the database. Called from worker threads;
/// timeouts and connection handling are the implementation's concern.
///

pub trait SqlExecutor: Send + Sync {
    fn execute(&self, statement: &SqlStatement) -> Result<Vec<Row>, SqlError>;
}

///
/// SqlError
///

#[derive(Debug, ThisError)]
pub enum SqlError {
    #[error("sql execution failed: {message}")]
    Failed { message: String },

    #[error("result row has {actual} values, statement shape has {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("grouping indicator must be 0 or 1, got {value}")]
    BadGroupingFlag { value: Value },

    #[error("result row matches no requested grain")]
    UnknownGrain,
}
