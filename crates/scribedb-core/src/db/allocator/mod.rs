//! Row id allocation.
//!
//! Each table owns a `TableAllocator` caching a block `[next, end)` claimed
//! from the persisted watermark. The watermark is the next id no block has
//! claimed yet; it only moves forward, through one committed
//! read-modify-write per refill or rebase. Ids of an aborted statement and
//! the unused tail of a discarded block are never handed out again.


use crate::{
    db::store::{KvStore, KvTxn, key},
    error::{ErrorClass, ErrorDetail, ErrorOrigin, InternalError},
    obs::{MetricsEvent, MetricsSink},
    types::{RowId, TableId},
};
use parking_lot::Mutex;
use scribedb_config::AllocatorConfig;
use std::{collections::HashMap, sync::Arc};
use thiserror::Error as ThisError;
use tracing::{debug, error, info};

/// One past the largest assignable row id.
const ID_SPACE_END: u64 = i64::MAX as u64 + 1;

/// Watermark of a table that has never allocated.
const INITIAL_WATERMARK: u64 = 1;

///
/// AllocatorError
///

#[derive(Debug, ThisError)]
pub enum AllocatorError {
    #[error(
        "identifier space exhausted for table {table}: requested {requested} ids at watermark {watermark}"
    )]
    Exhausted {
        table: TableId,
        requested: u64,
        watermark: u64,
    },

    #[error("allocation for table {table} must request at least one id")]
    EmptyRequest { table: TableId },
}

impl From<AllocatorError> for InternalError {
    fn from(err: AllocatorError) -> Self {
        let class = match err {
            AllocatorError::Exhausted { .. } => ErrorClass::Exhausted,
            AllocatorError::EmptyRequest { .. } => ErrorClass::InvariantViolation,
        };

        Self {
            class,
            origin: ErrorOrigin::Allocator,
            message: err.to_string(),
            detail: Some(ErrorDetail::Allocator(err)),
        }
    }
}

///
/// IdRange
/// Inclusive range of consecutive row ids handed to one statement.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IdRange {
    pub first: RowId,
    pub last: RowId,
}

impl IdRange {
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.last.get().abs_diff(self.first.get()) + 1
    }

    pub fn ids(self) -> impl Iterator<Item = RowId> {
        (self.first.get()..=self.last.get()).map(RowId::new)
    }
}

///
/// BlockCache
///

#[derive(Debug)]
struct BlockCache {
    next: u64,
    end: u64,
    step: u64,
}

impl BlockCache {
    const fn remaining(&self) -> u64 {
        self.end.saturating_sub(self.next)
    }
}

///
/// TableAllocator
///
/// Allocation state for one table. The lock is held across the in-memory
/// claim and, during refill or rebase, across the watermark transaction.
///

pub struct TableAllocator<S: KvStore> {
    table: TableId,
    store: Arc<S>,
    sink: Arc<dyn MetricsSink>,
    max_step: u64,
    cache: Mutex<BlockCache>,
}

impl<S: KvStore> TableAllocator<S> {
    #[must_use]
    pub fn new(
        table: TableId,
        store: Arc<S>,
        config: &AllocatorConfig,
        sink: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            table,
            store,
            sink,
            max_step: config.max_step.max(1),
            cache: Mutex::new(BlockCache {
                next: 0,
                end: 0,
                step: config.initial_step.clamp(1, config.max_step.max(1)),
            }),
        }
    }

    #[must_use]
    pub const fn table(&self) -> TableId {
        self.table
    }

    /// Hand out `count` consecutive ids.
    pub fn allocate(&self, count: u64) -> Result<IdRange, InternalError> {
        if count == 0 {
            return Err(AllocatorError::EmptyRequest { table: self.table }.into());
        }

        let mut cache = self.cache.lock();
        if cache.remaining() < count {
            self.refill(&mut cache, count)?;
        }

        let first = cache.next;
        cache.next += count;
        let range = IdRange {
            first: to_row_id(first),
            last: to_row_id(first + count - 1),
        };

        debug!(
            table_id = self.table.get(),
            first = range.first.get(),
            last = range.last.get(),
            count,
            cached_remaining = cache.remaining(),
            "range reservation"
        );
        self.sink.record(MetricsEvent::IdsAllocated {
            table: self.table,
            count,
        });

        Ok(range)
    }

    /// Move allocation past an explicitly supplied id.
    ///
    /// A cached block containing `explicit` is trimmed to start after it; an
    /// id at or above the watermark pushes the watermark to `explicit + 1`.
    pub fn rebase(&self, explicit: RowId) -> Result<(), InternalError> {
        self.rebase_all(&[explicit])
    }

    /// Move allocation past every id of `explicit`, lowest first.
    ///
    /// Ids are applied in ascending order under one lock so a high id never
    /// hides a lower one that still falls inside the cached block.
    pub fn rebase_all(&self, explicit: &[RowId]) -> Result<(), InternalError> {
        let mut ids = explicit
            .iter()
            .map(|id| {
                u64::try_from(id.get()).map_err(|_| {
                    InternalError::executor_invariant(format!(
                        "explicit row id {id} is not positive"
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        ids.sort_unstable();
        ids.dedup();

        let mut cache = self.cache.lock();
        for id in ids {
            self.rebase_locked(&mut cache, id)?;
        }

        Ok(())
    }

    fn rebase_locked(&self, cache: &mut BlockCache, explicit: u64) -> Result<(), InternalError> {
        if explicit < cache.next {
            return Ok(());
        }
        if explicit < cache.end {
            cache.next = explicit + 1;
            return Ok(());
        }

        let mut txn = self.store.begin()?;
        let before = read_watermark(&txn, self.table)?;
        if explicit < before {
            txn.abort();
            return Ok(());
        }

        let after = explicit + 1;
        write_watermark(&mut txn, self.table, after)?;
        txn.commit()?;

        info!(
            table_id = self.table.get(),
            explicit_rowid = explicit,
            watermark_before = before,
            watermark_after = after,
            "rebase on explicit row id"
        );
        self.sink
            .record(MetricsEvent::AllocatorRebase { table: self.table });

        Ok(())
    }

    // Claim a fresh block of at least `count` ids. The unused tail of the
    // current block is dropped.
    fn refill(&self, cache: &mut BlockCache, count: u64) -> Result<(), InternalError> {
        let mut txn = self.store.begin()?;
        let start = read_watermark(&txn, self.table)?;

        let capacity = ID_SPACE_END.saturating_sub(start);
        if capacity < count {
            txn.abort();
            error!(
                table_id = self.table.get(),
                watermark = start,
                requested = count,
                max_rowid = RowId::MAX.get(),
                "identifier space exhausted"
            );
            return Err(AllocatorError::Exhausted {
                table: self.table,
                requested: count,
                watermark: start,
            }
            .into());
        }

        let block = count.max(cache.step).min(capacity);
        let end = start + block;
        write_watermark(&mut txn, self.table, end)?;
        txn.commit()?;

        let discarded = cache.remaining();
        cache.next = start;
        cache.end = end;
        cache.step = cache.step.saturating_mul(2).min(self.max_step);

        info!(
            table_id = self.table.get(),
            block_start = start,
            block_end = end,
            discarded,
            next_step = cache.step,
            "allocator block refill"
        );
        self.sink.record(MetricsEvent::AllocatorRefill {
            table: self.table,
            block,
        });

        Ok(())
    }
}

///
/// RowIdAllocator
/// Registry of per-table allocators sharing one store handle.
///

pub struct RowIdAllocator<S: KvStore> {
    store: Arc<S>,
    config: AllocatorConfig,
    sink: Arc<dyn MetricsSink>,
    tables: Mutex<HashMap<TableId, Arc<TableAllocator<S>>>>,
}

impl<S: KvStore> RowIdAllocator<S> {
    #[must_use]
    pub fn new(store: Arc<S>, config: AllocatorConfig, sink: Arc<dyn MetricsSink>) -> Self {
        Self {
            store,
            config,
            sink,
            tables: Mutex::new(HashMap::new()),
        }
    }

    /// The allocator for `table`, created on first use.
    #[must_use]
    pub fn table(&self, table: TableId) -> Arc<TableAllocator<S>> {
        let mut tables = self.tables.lock();
        let entry = tables.entry(table).or_insert_with(|| {
            Arc::new(TableAllocator::new(
                table,
                Arc::clone(&self.store),
                &self.config,
                Arc::clone(&self.sink),
            ))
        });

        Arc::clone(entry)
    }

    pub fn allocate(&self, table: TableId, count: u64) -> Result<IdRange, InternalError> {
        self.table(table).allocate(count)
    }

    pub fn rebase(&self, table: TableId, explicit: RowId) -> Result<(), InternalError> {
        self.table(table).rebase(explicit)
    }

    pub fn rebase_all(&self, table: TableId, explicit: &[RowId]) -> Result<(), InternalError> {
        self.table(table).rebase_all(explicit)
    }
}

/// Read the persisted watermark of `table` inside `txn`.
pub(crate) fn read_watermark<T: KvTxn>(txn: &T, table: TableId) -> Result<u64, InternalError> {
    let key = key::watermark_key(table);

    let Some(bytes) = txn.get(&key)? else {
        return Ok(INITIAL_WATERMARK);
    };

    let watermark = key::decode_u64_value(&key, &bytes)?;
    if watermark < INITIAL_WATERMARK {
        return Err(InternalError::store_corruption(format!(
            "watermark for table {table} is {watermark}"
        )));
    }

    Ok(watermark)
}

fn write_watermark<T: KvTxn>(txn: &mut T, table: TableId, value: u64) -> Result<(), InternalError> {
    txn.put(key::watermark_key(table), value.to_be_bytes().to_vec())
}

// Callers only pass ids below ID_SPACE_END.
fn to_row_id(id: u64) -> RowId {
    RowId::new(i64::try_from(id).unwrap_or(i64::MAX))
}
