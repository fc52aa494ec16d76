//! Materialized aggregates and the index that holds them.

mod data;
mod header;
mod store;


pub use data::{CellKey, SegmentMap, SegmentWithData};
pub use header::{Coverage, SegmentColumn, SegmentHeader, SegmentId};
pub use store::{CellLookup, SegmentIndex, SegmentStore};
