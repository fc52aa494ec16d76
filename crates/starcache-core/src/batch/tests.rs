use super::*;
use crate::{
    bitkey::BitKey,
    predicate::{StarPredicate, compound_predicate},
    request::CellRequest,
    schema::{ColumnId, MeasureId},
    sql::{GenericDialect, RecordingSqlExecutor},
    test_fixtures::{Sales, sales},
    value::Value,
};
use proptest::prelude::*;

fn request(s: &Sales, measure: MeasureId, coords: &[(ColumnId, Value)]) -> CellRequest {
    coords
        .iter()
        .fold(CellRequest::builder(&s.schema, measure), |b, (c, v)| {
            b.constrain(*c, v.clone())
        })
        .build()
        .unwrap()
}

fn grouper(s: &Sales, requests: &[CellRequest]) -> BatchGrouper {
    let mut grouper = BatchGrouper::new(s.schema.clone());
    for r in requests {
        grouper.record(r).unwrap();
    }
    grouper
}

fn q1_months(s: &Sales) -> Vec<CellRequest> {
    (1..=3)
        .map(|m| {
            request(
                s,
                s.unit_sales,
                &[
                    (s.year, 1997.into()),
                    (s.quarter, "Q1".into()),
                    (s.month, m.into()),
                ],
            )
        })
        .collect()
}

#[test]
fn requests_with_equal_keys_share_a_batch() {
    let s = sales();
    let mut requests = q1_months(&s);
    requests.push(request(
        &s,
        s.store_sales,
        &[
            (s.year, 1997.into()),
            (s.quarter, "Q1".into()),
            (s.month, 1.into()),
        ],
    ));

    let g = grouper(&s, &requests);
    assert_eq!(g.batches().len(), 1);

    let batch = &g.batches()[0];
    assert_eq!(batch.request_count(), 4);
    assert_eq!(batch.measures().len(), 2);
    assert_eq!(batch.value_set(s.month).unwrap().value_count(), 3);
}

#[test]
fn detail_answers_coarser_summary() {
    let s = sales();
    let mut requests = q1_months(&s);
    requests.push(request(&s, s.unit_sales, &[(s.year, 1997.into())]));

    let composites = grouper(&s, &requests).into_composites();
    assert_eq!(composites.len(), 1);
    assert_eq!(composites[0].summaries().len(), 1);
    assert_eq!(composites[0].detail().bitkey().cardinality(), 3);
}

#[test]
fn equal_grains_never_merge() {
    let s = sales();
    let a = request(&s, s.unit_sales, &[(s.year, 1997.into())]);
    let b = CellRequest::builder(&s.schema, s.unit_sales)
        .constrain(s.year, 1997)
        .compound(StarPredicate::value(s.gender, "F"))
        .build()
        .unwrap();

    let g = grouper(&s, &[a, b]);
    let [first, second] = g.batches() else {
        panic!("expected two batches");
    };
    assert_eq!(first.rollup_verdict(second), RollupVerdict::SameGrain);
    assert_eq!(g.into_composites().len(), 2);
}

#[test]
fn uncovered_values_block_rollup() {
    let s = sales();
    let detail = request(
        &s,
        s.unit_sales,
        &[(s.year, 1997.into()), (s.quarter, "Q1".into())],
    );
    let summary = request(&s, s.unit_sales, &[(s.year, 1998.into())]);

    let g = grouper(&s, &[detail, summary]);
    assert_eq!(
        g.batches()[0].rollup_verdict(&g.batches()[1]),
        RollupVerdict::ValuesNotCovered { column: s.year }
    );
}

#[test]
fn distinct_count_rolls_up_only_along_its_own_table() {
    let s = sales();
    let along_customer: Vec<_> = ["F", "M"]
        .into_iter()
        .map(|g| {
            request(
                &s,
                s.customer_count,
                &[(s.year, 1997.into()), (s.gender, g.into())],
            )
        })
        .chain([request(&s, s.customer_count, &[(s.year, 1997.into())])])
        .collect();
    let g = grouper(&s, &along_customer);
    assert!(g.batches()[0].can_batch(&g.batches()[1]));

    let along_time = [
        request(
            &s,
            s.customer_count,
            &[(s.year, 1997.into()), (s.gender, "F".into())],
        ),
        request(&s, s.customer_count, &[(s.gender, "F".into())]),
    ];
    let g = grouper(&s, &along_time);
    assert_eq!(
        g.batches()[0].rollup_verdict(&g.batches()[1]),
        RollupVerdict::DistinctCountUnsafe { column: s.year }
    );
}

#[test]
fn declared_cardinality_requires_every_value() {
    let s = sales();
    let requests = [
        request(
            &s,
            s.unit_sales,
            &[(s.year, 1997.into()), (s.gender, "F".into())],
        ),
        request(&s, s.unit_sales, &[(s.year, 1997.into())]),
    ];

    let g = grouper(&s, &requests);
    assert_eq!(
        g.batches()[0].rollup_verdict(&g.batches()[1]),
        RollupVerdict::PartialRollupColumn { column: s.gender }
    );
}

#[test]
fn compound_predicates_must_be_identical() {
    let s = sales();
    let tuples = |q: &str| {
        compound_predicate(
            &[s.store_state, s.product_family],
            &[
                vec![Value::from("CA"), Value::from("Food")],
                vec![Value::from("OR"), Value::from(q)],
            ],
        )
        .unwrap()
    };
    let detail = CellRequest::builder(&s.schema, s.unit_sales)
        .constrain(s.year, 1997)
        .constrain(s.quarter, "Q1")
        .compound(tuples("Drink"))
        .build()
        .unwrap();
    let summary = CellRequest::builder(&s.schema, s.unit_sales)
        .constrain(s.year, 1997)
        .compound(tuples("Non-Consumable"))
        .build()
        .unwrap();

    let g = grouper(&s, &[detail, summary]);
    assert_eq!(
        g.batches()[0].rollup_verdict(&g.batches()[1]),
        RollupVerdict::CompoundMismatch
    );
}

#[test]
fn widest_detail_claims_all_compatible_summaries() {
    let s = sales();
    let requests = [
        request(&s, s.unit_sales, &[(s.year, 1997.into())]),
        request(
            &s,
            s.unit_sales,
            &[(s.year, 1997.into()), (s.quarter, "Q1".into())],
        ),
        request(
            &s,
            s.unit_sales,
            &[
                (s.year, 1997.into()),
                (s.quarter, "Q1".into()),
                (s.month, 1.into()),
            ],
        ),
    ];

    let composites = grouper(&s, &requests).into_composites();
    assert_eq!(composites.len(), 1);
    let grains: Vec<usize> = composites[0]
        .summaries()
        .iter()
        .map(|b| b.bitkey().cardinality())
        .collect();
    assert_eq!(grains, vec![2, 1]);
}

#[test]
fn standalone_batches_keep_a_stable_order() {
    let s = sales();
    let requests = [
        request(&s, s.unit_sales, &[(s.product_family, "Food".into())]),
        request(&s, s.unit_sales, &[(s.store_state, "CA".into())]),
        request(
            &s,
            s.unit_sales,
            &[(s.year, 1997.into()), (s.quarter, "Q1".into())],
        ),
    ];

    let keys: Vec<BitKey> = grouper(&s, &requests)
        .into_composites()
        .iter()
        .map(|c| c.detail().bitkey())
        .collect();
    assert_eq!(
        keys,
        vec![
            BitKey::from_columns([s.year, s.quarter]),
            BitKey::from_columns([s.product_family]),
            BitKey::from_columns([s.store_state]),
        ]
    );
}

fn year_rollup_composite(s: &Sales) -> CompositeBatch {
    let mut requests = q1_months(s);
    requests.push(request(s, s.unit_sales, &[(s.year, 1997.into())]));
    let mut composites = grouper(s, &requests).into_composites();

    composites.remove(0)
}

#[test]
fn grouping_sets_load_splits_rows_by_grain() {
    let s = sales();
    let composite = year_rollup_composite(&s);
    let executor = RecordingSqlExecutor::new(|_| {
        let detail = |m: i64, v: i64| {
            vec![
                Value::from(1997),
                Value::from("Q1"),
                Value::from(m),
                Value::from(v),
                Value::from(0),
                Value::from(0),
            ]
        };
        Ok(vec![
            detail(1, 100),
            detail(2, 110),
            detail(3, 120),
            vec![
                Value::from(1997),
                Value::Null,
                Value::Null,
                Value::from(330),
                Value::from(1),
                Value::from(1),
            ],
        ])
    });

    let map = composite
        .load(&GenericDialect::default(), &executor, LoadOptions::default())
        .unwrap();
    assert_eq!(executor.statement_count(), 1);
    assert!(executor.statements()[0].contains("grouping sets"));
    assert_eq!(map.len(), 2);

    let cells: Vec<usize> = map.iter().map(|seg| seg.cell_count()).collect();
    assert_eq!(cells, vec![3, 1]);
    let summary = map.iter().nth(1).unwrap();
    assert_eq!(
        summary.cell(&[Value::from(1997)]),
        Some(Some(&Value::from(330)))
    );
}

#[test]
fn fallback_issues_one_statement_per_batch() {
    let s = sales();
    let composite = year_rollup_composite(&s);
    let executor = RecordingSqlExecutor::new(|statement| {
        Ok(if statement.shape.len() == 2 {
            vec![vec![Value::from(1997), Value::from(330)]]
        } else {
            vec![vec![
                Value::from(1997),
                Value::from("Q1"),
                Value::from(1),
                Value::from(100),
            ]]
        })
    });
    let dialect = GenericDialect::new("mysql", false);

    let map = composite
        .load(&dialect, &executor, LoadOptions::default())
        .unwrap();
    assert_eq!(executor.statement_count(), 2);
    assert!(
        executor
            .statements()
            .iter()
            .all(|sql| !sql.contains("grouping"))
    );
    assert_eq!(map.len(), 2);
}

#[test]
fn disabled_grouping_sets_fall_back_even_when_supported() {
    let s = sales();
    let composite = year_rollup_composite(&s);
    let options = LoadOptions {
        grouping_sets: false,
        ..LoadOptions::default()
    };

    assert!(!composite.uses_grouping_sets(&GenericDialect::default(), options));
    assert_eq!(
        composite
            .statements(&GenericDialect::default(), options)
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn failed_statement_fails_the_whole_composite() {
    let s = sales();
    let composite = year_rollup_composite(&s);
    let executor = RecordingSqlExecutor::failing("connection reset");

    let err = composite
        .load(&GenericDialect::new("mysql", false), &executor, LoadOptions::default())
        .unwrap_err();
    assert_eq!(err.class, crate::error::ErrorClass::Execution);
    assert_eq!(executor.statement_count(), 1);
}

#[test]
fn malformed_rows_are_rejected() {
    let s = sales();
    let composite = year_rollup_composite(&s);
    let executor = RecordingSqlExecutor::new(|_| Ok(vec![vec![Value::from(1997)]]));

    let err = composite
        .load(&GenericDialect::default(), &executor, LoadOptions::default())
        .unwrap_err();
    assert!(err.message.contains("statement shape has 6"));
}

const LAW_COLUMNS: usize = 4;

fn law_columns(s: &Sales) -> [ColumnId; LAW_COLUMNS] {
    [s.year, s.quarter, s.month, s.product_family]
}

proptest! {
    #[test]
    fn can_batch_implies_strict_superset(
        a in prop::collection::btree_set(0..LAW_COLUMNS, 0..=LAW_COLUMNS),
        b in prop::collection::btree_set(0..LAW_COLUMNS, 0..=LAW_COLUMNS),
    ) {
        let s = sales();
        let cols = law_columns(&s);
        let build = |picked: &std::collections::BTreeSet<usize>| {
            let coords: Vec<(ColumnId, Value)> =
                picked.iter().map(|i| (cols[*i], Value::from(1))).collect();
            request(&s, s.unit_sales, &coords)
        };

        let g = grouper(&s, &[build(&a), build(&b)]);
        if let [first, second] = g.batches() {
            if first.can_batch(second) {
                prop_assert!(first.bitkey().is_superset_of(&second.bitkey()));
                prop_assert_ne!(first.bitkey(), second.bitkey());
            }
        } else {
            prop_assert_eq!(a, b);
        }
    }
}
