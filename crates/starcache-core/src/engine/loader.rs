use crate::{
    batch::BatchGrouper,
    engine::Engine,
    error::InternalError,
    executor::{CacheCommand, ContextStack, ExecutionContext, Handle, LoadId, promise},
    obs::{MetricsEvent, count},
    request::CellRequest,
    segment::{CellLookup, SegmentMap},
};
use std::sync::Arc;

///
/// BatchLoader
///
/// Collects the cell requests one statement misses, then loads them as
/// composite batches on the worker pool.
///

pub struct BatchLoader<'a> {
    engine: &'a Engine,
    context: ExecutionContext,
    grouper: BatchGrouper,
}

impl<'a> BatchLoader<'a> {
    pub(super) fn new(engine: &'a Engine, context: ExecutionContext) -> Self {
        Self {
            engine,
            context,
            grouper: BatchGrouper::new(Arc::clone(&engine.schema)),
        }
    }

    #[must_use]
    pub const fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Batches waiting for the next load.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.grouper.batches().len()
    }

    /// Look the cell up; a miss is recorded for the next load.
    pub fn record_cell_request(&mut self, request: &CellRequest) -> Result<CellLookup, InternalError> {
        let lookup = self.engine.segments().lookup_request(request);
        self.engine.sink().record(MetricsEvent::CellLookup {
            hit: !lookup.is_miss(),
        });

        if lookup.is_miss() {
            tracing::trace!(request = %request, "cell miss");
            self.grouper.record(request)?;
        }

        Ok(lookup)
    }

    /// Group the pending batches into composites and load each on a
    /// worker. Each composite's segments are installed before its handle
    /// resolves; a failed composite installs nothing. Every composite
    /// holds its place on the cache executor from this call on, so a
    /// flush submitted later drops the segments it touches.
    pub fn load_aggregations(&mut self) -> Result<LoadHandle, InternalError> {
        let schema = Arc::clone(&self.engine.schema);
        let grouper = std::mem::replace(&mut self.grouper, BatchGrouper::new(schema));
        let batches = grouper.batches().len();
        let composites = grouper.into_composites();

        tracing::debug!(batches, composites = composites.len(), "grouped batches");
        self.engine.sink().record(MetricsEvent::BatchesGrouped {
            batches: count(batches),
            composites: count(composites.len()),
        });

        let options = self.engine.config.load_options();
        let caching = !self.engine.config.disable_caching;
        let mut handles = Vec::with_capacity(composites.len());

        for composite in composites {
            let (reply, handle) = promise();
            let context = self.context.clone();
            let dialect = Arc::clone(&self.engine.dialect);
            let sql = Arc::clone(&self.engine.sql);
            let sink = Arc::clone(&self.engine.state.sink);
            let commands = self.engine.executor.sender();

            // flushes queued after this point apply to the load's rows too
            let reservation = if caching {
                let load = LoadId::next();
                commands.submit(context.clone(), CacheCommand::BeginLoad { load })?;
                Some(load)
            } else {
                None
            };

            self.engine.pool.execute(move || {
                let mut stack = ContextStack::new();
                let guard = stack.enter(context);

                sink.record(MetricsEvent::SqlIssued {
                    statements: count(composite.statement_count(dialect.as_ref(), options)),
                });
                let outcome = composite.load(dialect.as_ref(), sql.as_ref(), options);
                if let Err(err) = &outcome {
                    tracing::warn!(%err, "composite load failed");
                    sink.record(MetricsEvent::LoadFailed);
                }

                match reservation {
                    // the executor resolves the handle once installed
                    Some(load) => {
                        let install = CacheCommand::InstallSegments {
                            load,
                            outcome,
                            reply,
                        };
                        if let Err(err) = commands.submit(guard.context().clone(), install) {
                            tracing::warn!(%err, "loaded segments were not installed");
                        }
                    }
                    None => reply.fulfill(outcome),
                }
            })?;
            handles.push(handle);
        }

        Ok(LoadHandle { handles })
    }
}

///
/// LoadHandle
///
/// One handle per composite batch of a load.
///

#[derive(Debug)]
pub struct LoadHandle {
    handles: Vec<Handle<SegmentMap>>,
}

impl LoadHandle {
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every composite. Returns the merged segments, or the first
    /// failure once all composites have finished.
    pub fn wait(self) -> Result<SegmentMap, InternalError> {
        let mut merged = SegmentMap::new();
        let mut first_err = None;

        for result in self.wait_each() {
            match result {
                Ok(segments) => merged.extend(segments),
                Err(err) => {
                    first_err.get_or_insert(err);
                }
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(merged),
        }
    }

    /// Wait for every composite, keeping each outcome.
    #[must_use]
    pub fn wait_each(self) -> Vec<Result<SegmentMap, InternalError>> {
        self.handles.into_iter().map(Handle::wait).collect()
    }
}
