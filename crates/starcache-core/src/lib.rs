//! Core engine for starcache: batches cell requests into aggregate loads,
//! caches the resulting segments, and keeps them coherent under region
//! flushes and member edits.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod batch;
pub mod bitkey;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod member;
pub mod obs;
pub mod predicate;
pub mod region;
pub mod request;
pub mod schema;
pub mod segment;
pub mod sql;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, executors, stores, or SQL collaborators are re-exported here.
///

pub mod prelude {
    pub use crate::{
        member::Member,
        region::CellRegion,
        request::CellRequest,
        schema::{ColumnId, DimensionId, LevelId, MeasureId, Schema, StarId},
        value::Value,
    };
}
