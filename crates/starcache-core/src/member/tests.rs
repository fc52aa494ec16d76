use super::*;
use crate::{
    error::{ErrorClass, ErrorOrigin},
    test_fixtures::{Sales, sales},
    value::Value,
};

fn year(s: &Sales, y: i64) -> Member {
    Member::root(&s.schema, s.year_level, &y.to_string(), y).unwrap()
}

fn quarter(s: &Sales, y: i64, q: &str) -> Member {
    Member::child(&s.schema, &year(s, y), q, q).unwrap()
}

fn store_state(s: &Sales, state: &str) -> Member {
    let all_level = s.schema.hierarchy(s.store_hierarchy).unwrap().levels[0];
    let all = Member::root(&s.schema, all_level, "All Stores", Value::Null).unwrap();

    Member::child(&s.schema, &all, state, state).unwrap()
}

fn employee(s: &Sales, id: i64) -> Member {
    Member::root(&s.schema, s.employee_level, &id.to_string(), id).unwrap()
}

//
// model
//

#[test]
fn unique_names_follow_the_parent_chain() {
    let s = sales();
    let q1 = quarter(&s, 1997, "Q1");
    let jan = Member::child(&s.schema, &q1, "1", 1).unwrap();

    assert_eq!(jan.unique_name(), "[Time].[1997].[Q1].[1]");
    assert_eq!(jan.level(), s.month_level);
    assert_eq!(jan.dimension(), s.time);
    assert_eq!(
        jan.ancestors().map(Member::name).collect::<Vec<_>>(),
        vec!["Q1", "1997"]
    );
    assert!(year(&s, 1997).is_ancestor_of(&jan));
    assert!(!jan.is_ancestor_of(&q1));
}

#[test]
fn column_values_skip_levels_without_a_column() {
    let s = sales();

    let q1 = quarter(&s, 1997, "Q1");
    let values = q1.column_values(&s.schema).unwrap();
    assert_eq!(values.get(&s.year), Some(&Value::from(1997)));
    assert_eq!(values.get(&s.quarter), Some(&Value::from("Q1")));

    let ca = store_state(&s, "CA");
    let values = ca.column_values(&s.schema).unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values.get(&s.store_state), Some(&Value::from("CA")));
}

#[test]
fn member_levels_are_checked() {
    let s = sales();

    assert!(Member::root(&s.schema, s.quarter_level, "Q1", "Q1").is_err());

    let jan = Member::child(&s.schema, &quarter(&s, 1997, "Q1"), "1", 1).unwrap();
    assert!(Member::child(&s.schema, &jan, "x", 1).is_err());

    let boss = employee(&s, 1);
    let report = Member::child(&s.schema, &boss, "2", 2).unwrap();
    assert_eq!(report.level(), s.employee_level);
}

#[test]
fn members_compare_by_unique_name() {
    let s = sales();

    assert_eq!(quarter(&s, 1997, "Q1"), quarter(&s, 1997, "Q1"));
    assert_ne!(quarter(&s, 1997, "Q1"), quarter(&s, 1998, "Q1"));
    assert_eq!(format!("{:?}", year(&s, 1997)), "Member([Time].[1997])");
}

//
// commands
//

#[test]
fn parent_child_hierarchies_reject_structural_edits() {
    let s = sales();
    let e = employee(&s, 7);

    for err in [
        MemberEditCommand::add(&s.schema, e.clone()).unwrap_err(),
        MemberEditCommand::delete(&s.schema, std::slice::from_ref(&e)).unwrap_err(),
        MemberEditCommand::move_to(&s.schema, e, employee(&s, 1)).unwrap_err(),
    ] {
        assert_eq!(err.class, ErrorClass::Unsupported);
        assert_eq!(err.origin, ErrorOrigin::Member);
    }

    let err = MemberEditCommand::add(&s.schema, employee(&s, 3)).unwrap_err();
    assert_eq!(
        err.message,
        "cannot add members of parent-child hierarchy 'Employees'"
    );
}

#[test]
fn empty_member_sets_are_rejected() {
    let s = sales();

    let err = MemberEditCommand::delete(&s.schema, &[]).unwrap_err();
    assert!(err.is_invalid_argument());
    assert_eq!(err.message, "delete command requires at least one member");

    let err = MemberEditCommand::set_property(&s.schema, &[], "Store Manager", "x").unwrap_err();
    assert!(err.is_invalid_argument());

    assert!(MemberEditCommand::compound(Vec::new()).is_err());
}

#[test]
fn set_property_requires_one_level_and_a_declared_property() {
    let s = sales();
    let q1 = quarter(&s, 1997, "Q1");
    let jan = Member::child(&s.schema, &q1, "1", 1).unwrap();

    let err = MemberEditCommand::set_property(&s.schema, &[q1, jan], "Store Manager", "x")
        .unwrap_err();
    assert_eq!(
        err.message,
        "set-property members must share one level, got [Quarter, Month]"
    );

    let err = MemberEditCommand::set_property(&s.schema, &[store_state(&s, "CA")], "Color", "x")
        .unwrap_err();
    assert_eq!(err.message, "level 'Store State' declares no property 'Color'");

    let ok = MemberEditCommand::set_property(
        &s.schema,
        &[store_state(&s, "CA"), store_state(&s, "OR")],
        "Store Manager",
        "Smith",
    )
    .unwrap();
    assert!(ok.flush_regions(&s.schema).unwrap().is_empty());
}

#[test]
fn move_requires_a_parent_one_level_up() {
    let s = sales();
    let q1 = quarter(&s, 1997, "Q1");

    assert!(MemberEditCommand::move_to(&s.schema, q1.clone(), store_state(&s, "CA")).is_err());
    assert!(
        MemberEditCommand::move_to(&s.schema, q1.clone(), quarter(&s, 1997, "Q2")).is_err()
    );

    let cmd = MemberEditCommand::move_to(&s.schema, q1, year(&s, 1998)).unwrap();
    let MemberEditCommand::Move { moved, .. } = &cmd else {
        panic!("expected a move");
    };
    assert_eq!(moved.unique_name(), "[Time].[1998].[Q1]");
}

#[test]
fn add_flushes_member_subtree_and_ancestors() {
    let s = sales();
    let cmd = MemberEditCommand::add(&s.schema, quarter(&s, 1997, "Q1")).unwrap();

    let regions = cmd.flush_regions(&s.schema).unwrap();
    assert_eq!(regions.len(), 1);
    assert_eq!(
        regions[0].to_string(),
        "Crossjoin(Measures(measure#0, measure#1, measure#2), \
         Union(MemberAndDescendants([Time].[1997].[Q1]), Member([Time].[1997])))"
    );
}

#[test]
fn move_flushes_old_and_new_positions() {
    let s = sales();
    let cmd = MemberEditCommand::move_to(&s.schema, quarter(&s, 1997, "Q1"), year(&s, 1998))
        .unwrap();
    let compound = MemberEditCommand::compound(vec![
        cmd.clone(),
        MemberEditCommand::add(&s.schema, year(&s, 1999)).unwrap(),
    ])
    .unwrap();

    assert_eq!(cmd.flush_regions(&s.schema).unwrap().len(), 2);
    assert_eq!(compound.flush_regions(&s.schema).unwrap().len(), 3);
    assert!(!compound.flush_plan(&s.schema).unwrap().is_empty());
    assert_eq!(compound.kind(), "compound");
}

//
// cache
//

#[test]
fn edits_invalidate_children_lists() {
    let s = sales();
    let y97 = year(&s, 1997);
    let y98 = year(&s, 1998);
    let q1 = quarter(&s, 1997, "Q1");
    let mut cache = MemberCache::new();
    cache.cache_children(&y97, vec![q1.clone(), quarter(&s, 1997, "Q2")]);
    cache.cache_children(&y98, vec![quarter(&s, 1998, "Q1")]);
    cache.cache_children(&q1, vec![Member::child(&s.schema, &q1, "1", 1).unwrap()]);

    let add = MemberEditCommand::add(&s.schema, quarter(&s, 1998, "Q2")).unwrap();
    assert_eq!(cache.apply(&add), 1);
    assert!(cache.children(&y98).is_none());
    assert_eq!(cache.children(&y97).map(<[Member]>::len), Some(2));

    let delete = MemberEditCommand::delete(&s.schema, std::slice::from_ref(&q1)).unwrap();
    assert_eq!(cache.apply(&delete), 2);
    assert_eq!(cache.cached_lists(), 0);
}

#[test]
fn properties_follow_moves_and_vanish_on_delete() {
    let s = sales();
    let q1 = quarter(&s, 1997, "Q1");
    let mut cache = MemberCache::new();

    // quarters declare no properties; write through the cache directly
    cache.apply(&MemberEditCommand::SetProperty {
        members: vec![q1.clone()],
        property: "Note".to_string(),
        value: Value::from("closed"),
    });
    assert_eq!(cache.property(&q1, "Note"), Some(&Value::from("closed")));

    let mv = MemberEditCommand::move_to(&s.schema, q1.clone(), year(&s, 1998)).unwrap();
    cache.apply(&mv);
    let moved = quarter(&s, 1998, "Q1");
    assert_eq!(cache.property(&q1, "Note"), None);
    assert_eq!(cache.property(&moved, "Note"), Some(&Value::from("closed")));

    cache.apply(&MemberEditCommand::delete(&s.schema, &[moved.clone()]).unwrap());
    assert_eq!(cache.property(&moved, "Note"), None);
}
