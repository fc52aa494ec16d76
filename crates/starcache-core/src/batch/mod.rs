//! Batch grouping and composite loads.

mod composite;
mod grain;
mod grouper;

#[cfg(test)]
mod tests;

pub use composite::{CompositeBatch, LoadOptions};
pub use grain::{Batch, RollupVerdict};
pub use grouper::BatchGrouper;
