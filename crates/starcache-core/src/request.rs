//! Cell requests: one measure value at one point of the star.

use crate::{
    bitkey::BitKey,
    error::InternalError,
    predicate::{AggregationKey, StarPredicate},
    schema::{ColumnId, MeasureId, Schema, StarId},
    value::Value,
};
use std::{collections::BTreeMap, fmt};

///
/// CellRequest
///
/// Immutable once built. Constrained columns are grouped on; compound
/// predicates are filtered on only.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CellRequest {
    measure: MeasureId,
    key: AggregationKey,
    coordinates: BTreeMap<ColumnId, Value>,
}

impl CellRequest {
    #[must_use]
    pub fn builder(schema: &Schema, measure: MeasureId) -> CellRequestBuilder<'_> {
        CellRequestBuilder {
            schema,
            measure,
            coordinates: BTreeMap::new(),
            compound: Vec::new(),
            error: None,
        }
    }

    #[must_use]
    pub const fn measure(&self) -> MeasureId {
        self.measure
    }

    #[must_use]
    pub const fn star(&self) -> StarId {
        self.key.star()
    }

    #[must_use]
    pub const fn key(&self) -> &AggregationKey {
        &self.key
    }

    #[must_use]
    pub const fn coordinates(&self) -> &BTreeMap<ColumnId, Value> {
        &self.coordinates
    }

    /// Value predicates for the constrained columns, in column order.
    pub fn predicates(&self) -> impl Iterator<Item = StarPredicate> + '_ {
        self.coordinates
            .iter()
            .map(|(column, value)| StarPredicate::value(*column, value.clone()))
    }
}

impl fmt::Display for CellRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .coordinates
            .iter()
            .map(|(c, v)| format!("{c}={v}"))
            .collect();

        write!(f, "{}({})", self.measure, parts.join(", "))
    }
}

///
/// CellRequestBuilder
///
/// Collects constraints; the first invalid one is reported by `build`.
///

pub struct CellRequestBuilder<'a> {
    schema: &'a Schema,
    measure: MeasureId,
    coordinates: BTreeMap<ColumnId, Value>,
    compound: Vec<StarPredicate>,
    error: Option<InternalError>,
}

impl CellRequestBuilder<'_> {
    /// Constrain `column` to `value`.
    #[must_use]
    pub fn constrain(mut self, column: ColumnId, value: impl Into<Value>) -> Self {
        if self.error.is_none()
            && let Some(previous) = self.coordinates.insert(column, value.into())
        {
            self.error = Some(InternalError::request_invalid(format!(
                "{column} is already constrained to {previous}"
            )));
        }

        self
    }

    /// Filter on a multi-column predicate without grouping on its columns.
    #[must_use]
    pub fn compound(mut self, predicate: StarPredicate) -> Self {
        self.compound.push(predicate);
        self
    }

    pub fn build(self) -> Result<CellRequest, InternalError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let star = self.schema.resolve_measure(self.measure)?.star;
        let star_columns = self
            .schema
            .star(star)
            .map(|s| s.columns)
            .ok_or_else(|| InternalError::schema_invariant(format!("{star} is not in this schema")))?;

        let bitkey = BitKey::from_columns(self.coordinates.keys().copied());
        let filtered = self
            .compound
            .iter()
            .fold(BitKey::new(), |acc, p| acc.or(&p.columns()));
        let foreign = bitkey.or(&filtered).and_not(&star_columns);
        if let Some(column) = foreign.iter().next() {
            return Err(InternalError::request_invalid(format!(
                "{column} does not belong to {star}"
            )));
        }

        Ok(CellRequest {
            measure: self.measure,
            key: AggregationKey::new(star, bitkey, self.compound),
            coordinates: self.coordinates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{schema::Aggregator, test_fixtures::sales};

    #[test]
    fn request_key_tracks_constrained_columns() {
        let s = sales();
        let request = CellRequest::builder(&s.schema, s.unit_sales)
            .constrain(s.year, 1997)
            .constrain(s.quarter, "Q1")
            .build()
            .unwrap();

        assert_eq!(request.star(), s.star);
        assert_eq!(request.key().bitkey(), BitKey::from_columns([s.year, s.quarter]));
        assert_eq!(request.predicates().count(), 2);
    }

    #[test]
    fn double_constraint_is_rejected() {
        let s = sales();
        let err = CellRequest::builder(&s.schema, s.unit_sales)
            .constrain(s.year, 1997)
            .constrain(s.year, 1998)
            .build()
            .unwrap_err();

        assert!(err.message.contains("already constrained"));
    }

    #[test]
    fn columns_of_another_star_are_rejected() {
        let mut b = Schema::builder();
        let sales_star = b.add_star("sales").unwrap();
        let amount = b.add_column(sales_star, "sales", "amount", None).unwrap();
        let inventory = b.add_star("inventory").unwrap();
        let stock = b.add_column(inventory, "inventory", "stock", None).unwrap();
        let measure = b.add_measure("Amount", Aggregator::Sum, amount).unwrap();
        let schema = b.build();

        let err = CellRequest::builder(&schema, measure)
            .constrain(stock, 1)
            .build()
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }
}
