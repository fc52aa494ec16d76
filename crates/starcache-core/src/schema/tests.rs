use super::*;
use crate::{error::ErrorOrigin, test_fixtures::sales};

#[test]
fn measures_dimension_owns_ordinal_zero() {
    let s = sales();

    let measures = s.schema.dimension(DimensionId::MEASURES).unwrap();
    assert_eq!(measures.name, "Measures");
    assert_eq!(s.schema.dimension_by_name("Time"), Some(s.time));
}

#[test]
fn columns_are_registered_on_their_star() {
    let s = sales();
    let star = s.schema.star(s.star).unwrap();

    assert!(star.columns.get(s.year));
    assert!(star.columns.get(s.gender));
    assert_eq!(
        s.schema.column_by_name("customer", "gender"),
        Some(s.gender)
    );
    assert_eq!(
        s.schema.column(s.year).unwrap().qualified_name(),
        "time_by_day.the_year"
    );
}

#[test]
fn deeper_level_columns_skip_the_level_itself() {
    let s = sales();

    let below_year = s.schema.deeper_level_columns(s.year_level);
    assert_eq!(below_year, BitKey::from_columns([s.quarter, s.month]));
    assert!(s.schema.deeper_level_columns(s.month_level).is_empty());
}

#[test]
fn describe_dimensionality_uses_names() {
    let s = sales();

    assert_eq!(
        s.schema
            .describe_dimensionality(&[DimensionId::MEASURES, s.time]),
        "[Measures, Time]"
    );
}

#[test]
fn builder_rejects_duplicate_columns() {
    let mut b = Schema::builder();
    let star = b.add_star("fact").unwrap();
    b.add_column(star, "fact", "amount", None).unwrap();

    let err = b.add_column(star, "fact", "amount", None).unwrap_err();
    assert_eq!(err.origin, ErrorOrigin::Schema);
    assert!(err.is_invalid_argument());
}

#[test]
fn builder_rejects_columns_on_unjoined_tables() {
    let mut b = Schema::builder();
    let star = b.add_star("fact").unwrap();

    let err = b.add_column(star, "customer", "gender", None).unwrap_err();
    assert!(err.message.contains("not joined"));
}

#[test]
fn only_the_top_level_may_lack_a_key_column() {
    let mut b = Schema::builder();
    let star = b.add_star("fact").unwrap();
    let col = b.add_column(star, "fact", "region", None).unwrap();
    let dim = b.add_dimension("Region").unwrap();
    let hier = b.add_hierarchy(dim, "Region", false).unwrap();

    b.add_level(hier, "(All)", None, &[]).unwrap();
    b.add_level(hier, "Region", Some(col), &[]).unwrap();
    assert!(b.add_level(hier, "Broken", None, &[]).is_err());
}

#[test]
fn measures_dimension_cannot_carry_hierarchies() {
    let mut b = Schema::builder();

    assert!(b.add_hierarchy(DimensionId::MEASURES, "M", false).is_err());
}

#[test]
fn level_properties_are_declared_per_level() {
    let s = sales();
    let level = s.schema.level(s.store_state_level).unwrap();

    assert!(level.has_property("Store Sqft"));
    assert!(!level.has_property("Store Type"));
}
