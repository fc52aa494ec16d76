use crate::obs::{MetricsEvent, MetricsSink};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

///
/// EventOps
///
/// Saturating counters for one engine since creation or the last reset.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventOps {
    // Loading
    pub load_calls: u64,
    pub batches_grouped: u64,
    pub composites_loaded: u64,
    pub sql_statements: u64,
    pub load_failures: u64,
    pub segments_installed: u64,

    // Lookups
    pub cell_hits: u64,
    pub cell_misses: u64,

    // Coherency
    pub flushes: u64,
    pub segments_discarded: u64,
    pub segments_narrowed: u64,
    pub member_edits: u64,
    pub member_lists_invalidated: u64,
}

///
/// EngineMetrics
///

#[derive(Debug, Default)]
pub struct EngineMetrics {
    ops: Mutex<EventOps>,
}

impl EngineMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Point-in-time copy of the counters.
    #[must_use]
    pub fn report(&self) -> EventOps {
        self.ops.lock().clone()
    }

    pub fn reset(&self) {
        *self.ops.lock() = EventOps::default();
    }
}

impl MetricsSink for EngineMetrics {
    fn record(&self, event: MetricsEvent) {
        let mut m = self.ops.lock();
        match event {
            MetricsEvent::BatchesGrouped {
                batches,
                composites,
            } => {
                m.load_calls = m.load_calls.saturating_add(1);
                m.batches_grouped = m.batches_grouped.saturating_add(batches);
                m.composites_loaded = m.composites_loaded.saturating_add(composites);
            }
            MetricsEvent::SqlIssued { statements } => {
                m.sql_statements = m.sql_statements.saturating_add(statements);
            }
            MetricsEvent::SegmentsInstalled { segments } => {
                m.segments_installed = m.segments_installed.saturating_add(segments);
            }
            MetricsEvent::LoadFailed => {
                m.load_failures = m.load_failures.saturating_add(1);
            }
            MetricsEvent::Flush {
                discarded,
                narrowed,
            } => {
                m.flushes = m.flushes.saturating_add(1);
                m.segments_discarded = m.segments_discarded.saturating_add(discarded);
                m.segments_narrowed = m.segments_narrowed.saturating_add(narrowed);
            }
            MetricsEvent::MemberEdit {
                lists_invalidated, ..
            } => {
                m.member_edits = m.member_edits.saturating_add(1);
                m.member_lists_invalidated =
                    m.member_lists_invalidated.saturating_add(lists_invalidated);
            }
            MetricsEvent::CellLookup { hit: true } => {
                m.cell_hits = m.cell_hits.saturating_add(1);
            }
            MetricsEvent::CellLookup { hit: false } => {
                m.cell_misses = m.cell_misses.saturating_add(1);
            }
        }
    }
}
