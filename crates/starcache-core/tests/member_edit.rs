mod common;

use common::*;
use starcache_core::{
    error::{ErrorClass, ErrorOrigin},
    executor::ExecutionContext,
    member::Member,
    sql::GenericDialect,
};
use std::sync::Arc;

#[test_log::test]
fn moving_a_quarter_flushes_its_cells_and_both_parents() {
    let cube = cube();
    let engine = engine(&cube, GenericDialect::default(), Arc::new(monthly_sales()));

    let mut loader = engine.batch_loader(ExecutionContext::new("mdx", "SELECT months"));
    for m in 1..=12 {
        loader.record_cell_request(&month_request(&cube, 1997, m)).unwrap();
    }
    loader.load_aggregations().unwrap().wait().unwrap();

    let control = engine.cache_control(ExecutionContext::new("admin", "move Q1"));
    let (y97, y98) = (year_member(&cube, 1997), year_member(&cube, 1998));
    let quarters: Vec<Member> = ["Q1", "Q2", "Q3", "Q4"]
        .iter()
        .map(|q| quarter_member(&cube, 1997, q))
        .collect();
    control
        .cache_children(y97.clone(), quarters)
        .unwrap()
        .wait()
        .unwrap();
    control
        .cache_children(y98.clone(), Vec::new())
        .unwrap()
        .wait()
        .unwrap();

    let command = control
        .create_move_command(quarter_member(&cube, 1997, "Q1"), y98.clone())
        .unwrap();
    let report = control.execute(command).unwrap().wait().unwrap();

    assert_eq!((report.discarded, report.narrowed), (0, 1));
    assert_eq!(control.cached_children(&y97), None);
    assert_eq!(control.cached_children(&y98), None);

    let snapshot = engine.segments().snapshot();
    assert_eq!(snapshot.iter().next().unwrap().cell_count(), 9);
    assert_eq!(engine.metrics().member_lists_invalidated, 2);
}

#[test]
fn compound_edits_apply_as_one_command() {
    let cube = cube();
    let engine = engine(&cube, GenericDialect::default(), Arc::new(monthly_sales()));
    let control = engine.cache_control(ExecutionContext::new("admin", "compound"));

    let commands = vec![
        control.create_add_command(year_member(&cube, 1999)).unwrap(),
        control
            .create_delete_command(&[quarter_member(&cube, 1997, "Q4")])
            .unwrap(),
    ];
    let compound = control.create_compound_command(commands).unwrap();
    let report = control.execute(compound).unwrap().wait().unwrap();

    assert_eq!(report.changed(), 0);
    assert_eq!(engine.metrics().member_edits, 1);
}

#[test]
fn parent_child_hierarchies_cannot_be_edited() {
    let cube = cube();
    let engine = engine(&cube, GenericDialect::default(), Arc::new(monthly_sales()));
    let control = engine.cache_control(ExecutionContext::new("admin", "edit employees"));

    let boss = Member::root(&cube.schema, cube.employee_level, "1", 1).unwrap();
    let err = control.create_add_command(boss).unwrap_err();

    assert_eq!(err.class, ErrorClass::Unsupported);
    assert_eq!(err.origin, ErrorOrigin::Member);
}

#[test]
fn empty_edits_are_rejected_immediately() {
    let cube = cube();
    let engine = engine(&cube, GenericDialect::default(), Arc::new(monthly_sales()));
    let control = engine.cache_control(ExecutionContext::new("admin", "edit"));

    assert!(control.create_delete_command(&[]).unwrap_err().is_invalid_argument());
    assert!(control.create_compound_command(Vec::new()).is_err());
}
