use crate::{
    error::InternalError, predicate::StarPredicate, schema::ColumnId, value::Value,
};

/// Predicate for one column: a single value stays a value predicate,
/// several values become an `or` over value predicates.
pub fn column_predicate(
    column: ColumnId,
    values: impl IntoIterator<Item = Value>,
) -> Result<StarPredicate, InternalError> {
    let children: Vec<_> = values
        .into_iter()
        .map(|v| StarPredicate::value(column, v))
        .collect();

    StarPredicate::or(children)
        .map_err(|_| InternalError::predicate_invalid(format!("no values given for {column}")))
}

/// Multi-column constraint from a list of tuples, e.g. `(country, state)`
/// pairs. Each tuple becomes an `and`; several tuples are joined by `or`.
/// A single tuple collapses to its `and`.
pub fn compound_predicate(
    columns: &[ColumnId],
    tuples: &[Vec<Value>],
) -> Result<StarPredicate, InternalError> {
    if columns.is_empty() {
        return Err(InternalError::predicate_invalid(
            "compound predicate requires columns",
        ));
    }

    let mut disjuncts = Vec::with_capacity(tuples.len());
    for tuple in tuples {
        if tuple.len() != columns.len() {
            return Err(InternalError::predicate_invalid(format!(
                "tuple has {} values for {} columns",
                tuple.len(),
                columns.len()
            )));
        }

        let terms = columns
            .iter()
            .zip(tuple)
            .map(|(column, value)| StarPredicate::value(*column, value.clone()))
            .collect();
        disjuncts.push(StarPredicate::and(terms)?);
    }

    StarPredicate::or(disjuncts)
}
