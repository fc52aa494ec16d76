//! starcache: aggregation batching and segment cache coherency for ROLAP
//! star schemas.
//!
//! ## Crate layout
//! - `core`: the engine, regions, member edits, and SQL collaborators.
//! - `error`: the stable public error type.
//!
//! Engine entry points return the core's internal error; convert it with
//! `?` into [`Error`] at the application boundary.

pub use starcache_core as core;

pub mod error;

pub use crate::core::{
    config::EngineConfig,
    engine::{BatchLoader, CacheControl, Engine, EngineBuilder, LoadHandle},
    executor::{ExecutionContext, Handle},
};
pub use error::Error;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///
/// Domain vocabulary plus the engine surfaces a statement needs.
///

pub mod prelude {
    pub use crate::{
        BatchLoader, CacheControl, Engine, ExecutionContext,
        core::prelude::*,
    };
}
