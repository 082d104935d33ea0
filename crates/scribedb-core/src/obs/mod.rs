//! Observability: runtime telemetry (metrics) and sink abstractions.
//!
//! Structured logs go through `tracing` at the call sites; counters go
//! through `MetricsSink`. Neither affects execution semantics.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventReport, TableCounters};
pub use sink::{
    GlobalMetricsSink, LookupKind, MetricsEvent, MetricsSink, StatementOutcome, metrics_report,
    metrics_reset_all,
};
