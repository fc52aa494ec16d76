//! The engine: shared caches, the SQL worker pool, the cache executor,
//! and the per-statement surfaces that drive them.

mod control;
mod loader;


pub use control::CacheControl;
pub use loader::{BatchLoader, LoadHandle};

use crate::{
    config::EngineConfig,
    error::InternalError,
    executor::{CacheState, CommandExecutor, ExecutionContext, WorkerPool},
    member::{Member, MemberCache},
    obs::{EngineMetrics, EngineSink, EventOps, MetricsSink},
    schema::Schema,
    segment::SegmentStore,
    sql::{Dialect, SqlExecutor},
};
use parking_lot::RwLock;
use std::sync::Arc;

///
/// EngineBuilder
///

pub struct EngineBuilder {
    schema: Arc<Schema>,
    dialect: Arc<dyn Dialect>,
    sql: Arc<dyn SqlExecutor>,
    config: EngineConfig,
    sink: Option<Arc<dyn MetricsSink>>,
}

impl EngineBuilder {
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Forward every metrics event to `sink` as well as the engine's own
    /// counters.
    #[must_use]
    pub fn metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Validate the configuration and start the worker pool and executor.
    pub fn build(self) -> Result<Engine, InternalError> {
        self.config.validate()?;

        let metrics = Arc::new(EngineMetrics::new());
        let sink: Arc<dyn MetricsSink> =
            Arc::new(EngineSink::new(Arc::clone(&metrics), self.sink));
        let state = CacheState {
            segments: Arc::new(SegmentStore::new()),
            members: Arc::new(RwLock::new(MemberCache::new())),
            sink,
        };
        let executor = CommandExecutor::start(state.clone(), self.config.executor_queue_capacity)?;
        let pool = WorkerPool::new(self.config.worker_threads)?;

        tracing::debug!(
            workers = self.config.worker_threads,
            dialect = self.dialect.database_product(),
            "engine started"
        );

        Ok(Engine {
            schema: self.schema,
            dialect: self.dialect,
            sql: self.sql,
            config: self.config,
            state,
            metrics,
            executor,
            pool,
        })
    }
}

///
/// Engine
///
/// Owns the segment store, the member cache, and the threads that load
/// and mutate them. Statements reach it through a [`BatchLoader`] and a
/// [`CacheControl`], each bound to one [`ExecutionContext`].
///

pub struct Engine {
    schema: Arc<Schema>,
    dialect: Arc<dyn Dialect>,
    sql: Arc<dyn SqlExecutor>,
    config: EngineConfig,
    state: CacheState,
    metrics: Arc<EngineMetrics>,
    executor: CommandExecutor,
    pool: WorkerPool,
}

impl Engine {
    #[must_use]
    pub fn builder(
        schema: Arc<Schema>,
        dialect: Arc<dyn Dialect>,
        sql: Arc<dyn SqlExecutor>,
    ) -> EngineBuilder {
        EngineBuilder {
            schema,
            dialect,
            sql,
            config: EngineConfig::default(),
            sink: None,
        }
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn segments(&self) -> &SegmentStore {
        &self.state.segments
    }

    /// Cached children of `parent`, if loaded.
    #[must_use]
    pub fn cached_children(&self, parent: &Member) -> Option<Vec<Member>> {
        self.state.members.read().children(parent).map(<[Member]>::to_vec)
    }

    #[must_use]
    pub fn metrics(&self) -> EventOps {
        self.metrics.report()
    }

    #[must_use]
    pub fn batch_loader(&self, context: ExecutionContext) -> BatchLoader<'_> {
        BatchLoader::new(self, context)
    }

    #[must_use]
    pub const fn cache_control(&self, context: ExecutionContext) -> CacheControl<'_> {
        CacheControl::new(self, context)
    }

    /// Finish queued loads and cache commands, then stop every thread.
    /// Later submissions fail with a shutdown error.
    pub fn shutdown(&self) {
        self.pool.shutdown();
        self.executor.shutdown();
        tracing::debug!("engine stopped");
    }

    fn sink(&self) -> &dyn MetricsSink {
        self.state.sink.as_ref()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
