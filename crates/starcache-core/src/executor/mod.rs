//! Execution contexts, result handles, the SQL worker pool, and the
//! single thread that serializes every cache mutation.

mod context;
mod handle;
mod pool;
mod serial;


pub use context::{ContextGuard, ContextStack, ExecutionContext};
pub use handle::Handle;

pub(crate) use handle::promise;
pub(crate) use pool::WorkerPool;
pub(crate) use serial::{CacheCommand, CacheState, CommandExecutor, LoadId};
