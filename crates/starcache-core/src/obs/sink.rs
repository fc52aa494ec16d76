use crate::obs::EngineMetrics;
use std::sync::Arc;

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    /// Pending batches were grouped into composites for one load.
    BatchesGrouped { batches: u64, composites: u64 },
    SqlIssued { statements: u64 },
    SegmentsInstalled { segments: u64 },
    LoadFailed,
    Flush { discarded: u64, narrowed: u64 },
    MemberEdit {
        kind: &'static str,
        lists_invalidated: u64,
    },
    CellLookup { hit: bool },
}

///
/// MetricsSink
///
/// Receives events from worker threads and the executor thread alike.
///

pub trait MetricsSink: Send + Sync {
    fn record(&self, event: MetricsEvent);
}

///
/// NoopMetricsSink
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn record(&self, _: MetricsEvent) {}
}

///
/// EngineSink
///
/// The engine's own counters plus an optional caller-supplied sink.
///

#[derive(Clone)]
pub(crate) struct EngineSink {
    metrics: Arc<EngineMetrics>,
    extra: Option<Arc<dyn MetricsSink>>,
}

impl EngineSink {
    pub(crate) fn new(metrics: Arc<EngineMetrics>, extra: Option<Arc<dyn MetricsSink>>) -> Self {
        Self { metrics, extra }
    }
}

impl MetricsSink for EngineSink {
    fn record(&self, event: MetricsEvent) {
        self.metrics.record(event);
        if let Some(extra) = &self.extra {
            extra.record(event);
        }
    }
}

/// Event counts are u64 regardless of platform width.
pub(crate) fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}
