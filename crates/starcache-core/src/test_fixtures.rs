//! Shared sales-cube schema for unit tests.

use crate::schema::{
    Aggregator, ColumnId, DimensionId, HierarchyId, LevelId, MeasureId, Schema, StarId,
};
use std::sync::Arc;

///
/// Sales
///
/// `sales_fact_1997` joined to time, customer, product, store, and
/// employee tables. Only `customer.gender` declares a cardinality.
///

pub(crate) struct Sales {
    pub schema: Arc<Schema>,
    pub star: StarId,

    pub year: ColumnId,
    pub quarter: ColumnId,
    pub month: ColumnId,
    pub customer_id: ColumnId,
    pub gender: ColumnId,
    pub product_family: ColumnId,
    pub store_state: ColumnId,
    pub employee_id: ColumnId,

    pub unit_sales: MeasureId,
    pub store_sales: MeasureId,
    pub customer_count: MeasureId,

    pub time: DimensionId,
    pub customers: DimensionId,
    pub store: DimensionId,
    pub employees: DimensionId,

    pub time_hierarchy: HierarchyId,
    pub store_hierarchy: HierarchyId,
    pub employee_hierarchy: HierarchyId,

    pub year_level: LevelId,
    pub quarter_level: LevelId,
    pub month_level: LevelId,
    pub gender_level: LevelId,
    pub store_state_level: LevelId,
    pub employee_level: LevelId,
}

pub(crate) fn sales() -> Sales {
    let mut b = Schema::builder();

    let star = b.add_star("sales_fact_1997").unwrap();
    b.join_table(star, "time_by_day", "time_id", "time_id").unwrap();
    b.join_table(star, "customer", "customer_id", "customer_id").unwrap();
    b.join_table(star, "product", "product_id", "product_id").unwrap();
    b.join_table(star, "store", "store_id", "store_id").unwrap();
    b.join_table(star, "employee", "employee_id", "employee_id").unwrap();

    let year = b.add_column(star, "time_by_day", "the_year", None).unwrap();
    let quarter = b.add_column(star, "time_by_day", "quarter", None).unwrap();
    let month = b.add_column(star, "time_by_day", "month_of_year", None).unwrap();
    let customer_id = b.add_column(star, "customer", "customer_id", None).unwrap();
    let gender = b.add_column(star, "customer", "gender", Some(2)).unwrap();
    let product_family = b.add_column(star, "product", "product_family", None).unwrap();
    let store_state = b.add_column(star, "store", "store_state", None).unwrap();
    let employee_id = b.add_column(star, "employee", "employee_id", None).unwrap();
    let unit_col = b.add_column(star, "sales_fact_1997", "unit_sales", None).unwrap();
    let store_col = b.add_column(star, "sales_fact_1997", "store_sales", None).unwrap();

    let unit_sales = b.add_measure("Unit Sales", Aggregator::Sum, unit_col).unwrap();
    let store_sales = b.add_measure("Store Sales", Aggregator::Sum, store_col).unwrap();
    let customer_count = b
        .add_measure("Customer Count", Aggregator::DistinctCount, customer_id)
        .unwrap();

    let time = b.add_dimension("Time").unwrap();
    let time_hierarchy = b.add_hierarchy(time, "Time", false).unwrap();
    let year_level = b.add_level(time_hierarchy, "Year", Some(year), &[]).unwrap();
    let quarter_level = b.add_level(time_hierarchy, "Quarter", Some(quarter), &[]).unwrap();
    let month_level = b.add_level(time_hierarchy, "Month", Some(month), &[]).unwrap();

    let customers = b.add_dimension("Customers").unwrap();
    let customer_hierarchy = b.add_hierarchy(customers, "Gender", false).unwrap();
    b.add_level(customer_hierarchy, "(All)", None, &[]).unwrap();
    let gender_level = b.add_level(customer_hierarchy, "Gender", Some(gender), &[]).unwrap();

    let store = b.add_dimension("Store").unwrap();
    let store_hierarchy = b.add_hierarchy(store, "Store", false).unwrap();
    b.add_level(store_hierarchy, "(All)", None, &[]).unwrap();
    let store_state_level = b
        .add_level(store_hierarchy, "Store State", Some(store_state), &["Store Manager", "Store Sqft"])
        .unwrap();

    let employees = b.add_dimension("Employees").unwrap();
    let employee_hierarchy = b.add_hierarchy(employees, "Employees", true).unwrap();
    let employee_level = b
        .add_level(employee_hierarchy, "Employee Id", Some(employee_id), &[])
        .unwrap();

    Sales {
        schema: Arc::new(b.build()),
        star,
        year,
        quarter,
        month,
        customer_id,
        gender,
        product_family,
        store_state,
        employee_id,
        unit_sales,
        store_sales,
        customer_count,
        time,
        customers,
        store,
        employees,
        time_hierarchy,
        store_hierarchy,
        employee_hierarchy,
        year_level,
        quarter_level,
        month_level,
        gender_level,
        store_state_level,
        employee_level,
    }
}
