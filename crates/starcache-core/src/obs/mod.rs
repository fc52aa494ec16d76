//! Observability: engine counters and the sink boundary.
//!
//! Cache and loader code never touches counters directly; every
//! observation flows through a [`MetricsEvent`] recorded on a
//! [`MetricsSink`].

mod metrics;
mod sink;


pub use metrics::{EngineMetrics, EventOps};
pub use sink::{MetricsEvent, MetricsSink, NoopMetricsSink};

pub(crate) use sink::{EngineSink, count};
