//! Metrics sink boundary.
//!
//! Core DB logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.

use crate::{obs::metrics, types::TableId};

///
/// LookupKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LookupKind {
    Ordered,
    Inverted,
    FullScan,
}

///
/// StatementOutcome
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatementOutcome {
    Committed,
    Aborted,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MetricsEvent {
    InsertStart {
        table: TableId,
    },
    InsertFinish {
        table: TableId,
        outcome: StatementOutcome,
        rows: u64,
        warnings: u64,
    },
    AllocatorRefill {
        table: TableId,
        block: u64,
    },
    AllocatorRebase {
        table: TableId,
    },
    IdsAllocated {
        table: TableId,
        count: u64,
    },
    IndexDelta {
        table: TableId,
        ordered: u64,
        postings: u64,
    },
    UniqueViolation {
        table: TableId,
    },
    Lookup {
        kind: LookupKind,
        rows: u64,
    },
    Rank {
        candidates: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink: Send + Sync {
    fn record(&self, event: MetricsEvent);
}

///
/// GlobalMetricsSink
/// Default process-wide sink that writes into global metrics state.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        metrics::with_state_mut(|m| match event {
            MetricsEvent::InsertStart { table } => {
                m.ops.insert_calls = m.ops.insert_calls.saturating_add(1);
                let entry = m.tables.entry(table.get()).or_default();
                entry.insert_calls = entry.insert_calls.saturating_add(1);
            }

            MetricsEvent::InsertFinish {
                table,
                outcome,
                rows,
                warnings,
            } => {
                let entry = m.tables.entry(table.get()).or_default();
                match outcome {
                    StatementOutcome::Committed => {
                        m.ops.insert_commits = m.ops.insert_commits.saturating_add(1);
                        m.ops.rows_inserted = m.ops.rows_inserted.saturating_add(rows);
                        entry.rows_inserted = entry.rows_inserted.saturating_add(rows);
                    }
                    StatementOutcome::Aborted => {
                        m.ops.insert_aborts = m.ops.insert_aborts.saturating_add(1);
                        entry.insert_aborts = entry.insert_aborts.saturating_add(1);
                    }
                }
                m.ops.coercion_warnings = m.ops.coercion_warnings.saturating_add(warnings);
            }

            MetricsEvent::AllocatorRefill { .. } => {
                m.ops.allocator_refills = m.ops.allocator_refills.saturating_add(1);
            }

            MetricsEvent::AllocatorRebase { .. } => {
                m.ops.allocator_rebases = m.ops.allocator_rebases.saturating_add(1);
            }

            MetricsEvent::IdsAllocated { table, count } => {
                m.ops.ids_allocated = m.ops.ids_allocated.saturating_add(count);
                let entry = m.tables.entry(table.get()).or_default();
                entry.ids_allocated = entry.ids_allocated.saturating_add(count);
            }

            MetricsEvent::IndexDelta {
                table,
                ordered,
                postings,
            } => {
                m.ops.ordered_index_inserts = m.ops.ordered_index_inserts.saturating_add(ordered);
                m.ops.posting_inserts = m.ops.posting_inserts.saturating_add(postings);
                let entry = m.tables.entry(table.get()).or_default();
                entry.ordered_index_inserts = entry.ordered_index_inserts.saturating_add(ordered);
                entry.posting_inserts = entry.posting_inserts.saturating_add(postings);
            }

            MetricsEvent::UniqueViolation { table } => {
                m.ops.unique_violations = m.ops.unique_violations.saturating_add(1);
                let entry = m.tables.entry(table.get()).or_default();
                entry.unique_violations = entry.unique_violations.saturating_add(1);
            }

            MetricsEvent::Lookup { kind, rows } => {
                match kind {
                    LookupKind::Ordered => {
                        m.ops.ordered_lookups = m.ops.ordered_lookups.saturating_add(1);
                    }
                    LookupKind::Inverted => {
                        m.ops.inverted_lookups = m.ops.inverted_lookups.saturating_add(1);
                    }
                    LookupKind::FullScan => {
                        m.ops.full_scans = m.ops.full_scans.saturating_add(1);
                    }
                }
                m.ops.rows_scanned = m.ops.rows_scanned.saturating_add(rows);
            }

            MetricsEvent::Rank { candidates } => {
                m.ops.rank_calls = m.ops.rank_calls.saturating_add(1);
                m.ops.rank_candidates = m.ops.rank_candidates.saturating_add(candidates);
            }
        });
    }
}

/// Snapshot the process-wide metrics.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset the process-wide metrics.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

///
/// RecordingSink
/// Test sink that keeps every event in arrival order.
///

#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    events: parking_lot::Mutex<Vec<MetricsEvent>>,
}

#[cfg(test)]
impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<MetricsEvent> {
        self.events.lock().clone()
    }
}

#[cfg(test)]
impl MetricsSink for RecordingSink {
    fn record(&self, event: MetricsEvent) {
        self.events.lock().push(event);
    }
}

///
/// TESTS
///
