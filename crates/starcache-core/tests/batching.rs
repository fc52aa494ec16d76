mod common;

use common::*;
use starcache_core::{
    executor::ExecutionContext,
    segment::CellLookup,
    sql::{GenericDialect, RecordingSqlExecutor},
    value::Value,
};
use std::{sync::Arc, thread};

// Months of 1997 Q1 plus the 1997 total, in whichever statement shape
// the dialect asked for.
fn q1_with_year_total() -> RecordingSqlExecutor {
    RecordingSqlExecutor::new(|statement| {
        let months = (1..=3).map(|m| (m, 100 + m));
        Ok(match statement.shape.len() {
            // year, measure
            2 => vec![vec![Value::from(1997), Value::from(306)]],
            // year, quarter, month, measure
            4 => months
                .map(|(m, v)| {
                    vec![
                        Value::from(1997),
                        Value::from("Q1"),
                        Value::from(m),
                        Value::from(v),
                    ]
                })
                .collect(),
            // ... plus grouping(quarter), grouping(month)
            _ => months
                .map(|(m, v)| {
                    vec![
                        Value::from(1997),
                        Value::from("Q1"),
                        Value::from(m),
                        Value::from(v),
                        Value::from(0),
                        Value::from(0),
                    ]
                })
                .chain([vec![
                    Value::from(1997),
                    Value::Null,
                    Value::Null,
                    Value::from(306),
                    Value::from(1),
                    Value::from(1),
                ]])
                .collect(),
        })
    })
}

fn record_q1_and_year(cube: &Cube, engine: &starcache_core::engine::Engine) {
    let mut loader = engine.batch_loader(ExecutionContext::new("mdx", "SELECT Q1, 1997"));
    for m in 1..=3 {
        loader.record_cell_request(&month_request(cube, 1997, m)).unwrap();
    }
    loader.record_cell_request(&year_request(cube, 1997)).unwrap();
    assert_eq!(loader.pending(), 2);

    let handle = loader.load_aggregations().unwrap();
    assert_eq!(handle.len(), 1);
    assert_eq!(handle.wait().unwrap().len(), 2);
}

#[test_log::test]
fn detail_and_summary_load_in_one_grouping_sets_statement() {
    let cube = cube();
    let sql = Arc::new(q1_with_year_total());
    let engine = engine(&cube, GenericDialect::default(), sql.clone());

    record_q1_and_year(&cube, &engine);

    assert_eq!(sql.statement_count(), 1);
    assert!(sql.statements()[0].contains("grouping sets"));
    assert_eq!(engine.metrics().composites_loaded, 1);

    let mut loader = engine.batch_loader(ExecutionContext::new("mdx", "SELECT 1997"));
    assert_eq!(
        loader.record_cell_request(&year_request(&cube, 1997)).unwrap(),
        CellLookup::Hit(Value::from(306))
    );
}

#[test_log::test]
fn dialects_without_grouping_sets_issue_one_statement_per_batch() {
    let cube = cube();
    let sql = Arc::new(q1_with_year_total());
    let engine = engine(&cube, GenericDialect::new("mysql", false), sql.clone());

    record_q1_and_year(&cube, &engine);

    assert_eq!(sql.statement_count(), 2);
    assert!(sql.statements().iter().all(|s| !s.contains("grouping")));
    assert_eq!(engine.segments().len(), 2);
}

#[test_log::test]
fn concurrent_loads_install_one_copy_per_header() {
    let cube = cube();
    let engine = engine(&cube, GenericDialect::default(), Arc::new(monthly_sales()));

    thread::scope(|scope| {
        for session in 0..4 {
            let (cube, engine) = (&cube, &engine);
            scope.spawn(move || {
                let context = ExecutionContext::new(format!("session-{session}"), "SELECT");
                let mut loader = engine.batch_loader(context);
                for m in 1..=12 {
                    loader.record_cell_request(&month_request(cube, 1997, m)).unwrap();
                }
                loader.load_aggregations().unwrap().wait().unwrap();
            });
        }
    });

    assert_eq!(engine.segments().len(), 1);
    assert_eq!(engine.metrics().segments_installed, 4);
}
