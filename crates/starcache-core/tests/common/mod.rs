//! Sales cube shared by the integration scenarios.
#![allow(dead_code)]

use starcache_core::{
    engine::Engine,
    member::Member,
    request::CellRequest,
    schema::{Aggregator, ColumnId, LevelId, MeasureId, Schema},
    sql::{GenericDialect, RecordingSqlExecutor, SqlExecutor},
    value::Value,
};
use crossbeam_channel::Receiver;
use std::sync::Arc;

pub struct Cube {
    pub schema: Arc<Schema>,
    pub year: ColumnId,
    pub quarter: ColumnId,
    pub month: ColumnId,
    pub unit_sales: MeasureId,
    pub year_level: LevelId,
    pub employee_level: LevelId,
}

pub fn cube() -> Cube {
    let mut b = Schema::builder();

    let star = b.add_star("sales_fact_1997").unwrap();
    b.join_table(star, "time_by_day", "time_id", "time_id").unwrap();
    b.join_table(star, "employee", "employee_id", "employee_id").unwrap();

    let year = b.add_column(star, "time_by_day", "the_year", None).unwrap();
    let quarter = b.add_column(star, "time_by_day", "quarter", None).unwrap();
    let month = b.add_column(star, "time_by_day", "month_of_year", None).unwrap();
    let employee_id = b.add_column(star, "employee", "employee_id", None).unwrap();
    let units = b.add_column(star, "sales_fact_1997", "unit_sales", None).unwrap();
    let unit_sales = b.add_measure("Unit Sales", Aggregator::Sum, units).unwrap();

    let time = b.add_dimension("Time").unwrap();
    let hierarchy = b.add_hierarchy(time, "Time", false).unwrap();
    let year_level = b.add_level(hierarchy, "Year", Some(year), &[]).unwrap();
    b.add_level(hierarchy, "Quarter", Some(quarter), &[]).unwrap();
    b.add_level(hierarchy, "Month", Some(month), &[]).unwrap();

    let employees = b.add_dimension("Employees").unwrap();
    let hierarchy = b.add_hierarchy(employees, "Employees", true).unwrap();
    let employee_level = b
        .add_level(hierarchy, "Employee Id", Some(employee_id), &[])
        .unwrap();

    Cube {
        schema: Arc::new(b.build()),
        year,
        quarter,
        month,
        unit_sales,
        year_level,
        employee_level,
    }
}

pub fn engine(cube: &Cube, dialect: GenericDialect, sql: Arc<dyn SqlExecutor>) -> Engine {
    Engine::builder(cube.schema.clone(), Arc::new(dialect), sql)
        .build()
        .unwrap()
}

pub fn quarter_of(month: i64) -> String {
    format!("Q{}", (month - 1) / 3 + 1)
}

pub fn month_request(cube: &Cube, year: i64, month: i64) -> CellRequest {
    CellRequest::builder(&cube.schema, cube.unit_sales)
        .constrain(cube.year, year)
        .constrain(cube.quarter, quarter_of(month))
        .constrain(cube.month, month)
        .build()
        .unwrap()
}

pub fn year_request(cube: &Cube, year: i64) -> CellRequest {
    CellRequest::builder(&cube.schema, cube.unit_sales)
        .constrain(cube.year, year)
        .build()
        .unwrap()
}

pub fn year_member(cube: &Cube, year: i64) -> Member {
    Member::root(&cube.schema, cube.year_level, &year.to_string(), year).unwrap()
}

pub fn quarter_member(cube: &Cube, year: i64, quarter: &str) -> Member {
    Member::child(&cube.schema, &year_member(cube, year), quarter, quarter).unwrap()
}

/// Unit sales of 1997 at month grain: `100 + month` per month.
pub fn monthly_sales() -> RecordingSqlExecutor {
    RecordingSqlExecutor::new(|_| Ok(monthly_rows()))
}

/// Same rows as [`monthly_sales`], but each statement waits for a signal
/// on `gate` before answering.
pub fn gated_monthly_sales(gate: Receiver<()>) -> RecordingSqlExecutor {
    RecordingSqlExecutor::new(move |_| {
        gate.recv().ok();
        Ok(monthly_rows())
    })
}

fn monthly_rows() -> Vec<Vec<Value>> {
    (1..=12)
        .map(|m| {
            vec![
                Value::from(1997),
                Value::from(quarter_of(m)),
                Value::from(m),
                Value::from(100 + m),
            ]
        })
        .collect()
}
