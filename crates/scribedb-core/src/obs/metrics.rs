use parking_lot::Mutex;
use serde::Serialize;
use std::{
    collections::BTreeMap,
    sync::LazyLock,
    time::{SystemTime, UNIX_EPOCH},
};

///
/// EventState
/// Ephemeral, in-memory counters for engine operations.
///

#[derive(Clone, Debug, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub tables: BTreeMap<u32, TableCounters>,
    pub since_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            tables: BTreeMap::new(),
            since_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct EventOps {
    // Insert coordinator
    pub insert_calls: u64,
    pub insert_commits: u64,
    pub insert_aborts: u64,
    pub rows_inserted: u64,
    pub coercion_warnings: u64,

    // Row id allocator
    pub allocator_refills: u64,
    pub allocator_rebases: u64,
    pub ids_allocated: u64,

    // Index maintenance
    pub ordered_index_inserts: u64,
    pub posting_inserts: u64,
    pub unique_violations: u64,

    // Read-side hooks
    pub ordered_lookups: u64,
    pub inverted_lookups: u64,
    pub full_scans: u64,
    pub rows_scanned: u64,
    pub rank_calls: u64,
    pub rank_candidates: u64,
}

///
/// TableCounters
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct TableCounters {
    pub insert_calls: u64,
    pub insert_aborts: u64,
    pub rows_inserted: u64,
    pub ids_allocated: u64,
    pub ordered_index_inserts: u64,
    pub posting_inserts: u64,
    pub unique_violations: u64,
}

/// EventReport
/// Point-in-time copy of the counters.
pub type EventReport = EventState;

static EVENT_STATE: LazyLock<Mutex<EventState>> =
    LazyLock::new(|| Mutex::new(EventState::default()));

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    f(&EVENT_STATE.lock())
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    f(&mut EVENT_STATE.lock())
}

/// Reset all counters (useful in tests).
pub fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

/// Snapshot the current counters.
#[must_use]
pub fn report() -> EventReport {
    with_state(Clone::clone)
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
