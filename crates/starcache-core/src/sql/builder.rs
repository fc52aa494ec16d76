use crate::{
    bitkey::BitKey,
    error::InternalError,
    predicate::{StarPredicate, ValueSet},
    schema::{ColumnId, MeasureId, Schema, StarId},
    sql::{Dialect, RowShape, ShapeColumn, SqlStatement},
};
use std::collections::{BTreeMap, BTreeSet};

///
/// StatementSpec
///
/// Inputs for one aggregate statement. `columns` is the finest grain;
/// `grouping_sets`, when present, lists every grain to return.
///

pub(crate) struct StatementSpec<'a> {
    pub star: StarId,
    pub columns: &'a BTreeMap<ColumnId, ValueSet>,
    pub measures: &'a BTreeSet<MeasureId>,
    pub compound: &'a [StarPredicate],
    pub grouping_sets: Option<&'a [BitKey]>,
    pub formatted: bool,
}

pub(crate) fn build_statement(
    schema: &Schema,
    dialect: &dyn Dialect,
    spec: &StatementSpec<'_>,
) -> Result<SqlStatement, InternalError> {
    let star = schema
        .star(spec.star)
        .ok_or_else(|| InternalError::schema_invariant(format!("{} is not in this schema", spec.star)))?;

    // tables the statement touches
    let mut used = BTreeSet::new();
    for column in spec.columns.keys() {
        used.insert(schema.resolve_column(*column)?.table.clone());
    }
    for measure in spec.measures {
        let base = schema.resolve_measure(*measure)?.column;
        used.insert(schema.resolve_column(base)?.table.clone());
    }
    for predicate in spec.compound {
        for column in predicate.columns().iter() {
            used.insert(schema.resolve_column(column)?.table.clone());
        }
    }

    let mut shape = RowShape::default();
    let mut select = Vec::new();
    for column in spec.columns.keys() {
        let i = shape.push(ShapeColumn::Key(*column));
        select.push(format!(
            "{} as {}",
            dialect.column_expr(schema, *column)?,
            dialect.quote_identifier(&format!("c{i}"))
        ));
    }
    for measure in spec.measures {
        let m = schema.resolve_measure(*measure)?;
        let expr = dialect.aggregate(m.aggregator, &dialect.column_expr(schema, m.column)?);
        let i = shape.push(ShapeColumn::Measure(*measure));
        select.push(format!("{expr} as {}", dialect.quote_identifier(&format!("m{i}"))));
    }
    if let Some(grains) = spec.grouping_sets {
        for column in spec.columns.keys() {
            if grains.iter().all(|g| g.get(*column)) {
                continue;
            }
            let i = shape.push(ShapeColumn::Grouping(*column));
            select.push(format!(
                "grouping({}) as {}",
                dialect.column_expr(schema, *column)?,
                dialect.quote_identifier(&format!("g{i}"))
            ));
        }
    }

    let mut from = Vec::new();
    let mut filters = Vec::new();
    for table in star.tables.iter().filter(|t| used.contains(&t.name)) {
        let quoted = dialect.quote_identifier(&table.name);
        from.push(format!("{quoted} as {quoted}"));
        if let Some(join) = &table.join {
            filters.push(format!(
                "{} = {}",
                dialect.quote_column(&star.fact_table, &join.foreign_key),
                dialect.quote_column(&table.name, &join.primary_key)
            ));
        }
    }
    if !used.contains(&star.fact_table) {
        let quoted = dialect.quote_identifier(&star.fact_table);
        from.insert(0, format!("{quoted} as {quoted}"));
    }
    for (column, values) in spec.columns {
        filters.push(dialect.lower_value_set(&dialect.column_expr(schema, *column)?, values));
    }
    for predicate in spec.compound {
        filters.push(dialect.lower_predicate(schema, predicate)?);
    }

    let mut group_by = Vec::new();
    match spec.grouping_sets {
        Some(grains) => {
            let mut sets = Vec::with_capacity(grains.len());
            for grain in grains {
                let exprs = grain
                    .iter()
                    .map(|c| dialect.column_expr(schema, c))
                    .collect::<Result<Vec<_>, _>>()?;
                sets.push(format!("({})", exprs.join(", ")));
            }
            group_by.push(format!("grouping sets ({})", sets.join(", ")));
        }
        None => {
            for column in spec.columns.keys() {
                group_by.push(dialect.column_expr(schema, *column)?);
            }
        }
    }

    let sql = render(&select, &from, &filters, &group_by, spec.formatted);

    Ok(SqlStatement { sql, shape })
}

fn render(
    select: &[String],
    from: &[String],
    filters: &[String],
    group_by: &[String],
    formatted: bool,
) -> String {
    let (open, list_sep, and_sep) = if formatted {
        ("\n    ", ",\n    ", "\n    and ")
    } else {
        (" ", ", ", " and ")
    };
    let clause_sep = if formatted { "\n" } else { " " };

    let mut clauses = vec![
        format!("select{open}{}", select.join(list_sep)),
        format!("from{open}{}", from.join(list_sep)),
    ];
    if !filters.is_empty() {
        clauses.push(format!("where{open}{}", filters.join(and_sep)));
    }
    if !group_by.is_empty() {
        clauses.push(format!("group by{open}{}", group_by.join(list_sep)));
    }

    clauses.join(clause_sep)
}
