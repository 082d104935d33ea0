//! Storage collaborator contract.
//!
//! The core never owns persistence. It drives a transactional key-value
//! store through `KvStore` / `KvTxn`, relying on snapshot isolation and
//! atomic multi-key commit. `MemoryStore` is the in-process reference
//! implementation used by embedders and tests.

pub(crate) mod key;
mod memory;

#[cfg(test)]
pub(crate) mod flaky;
#[cfg(test)]
mod tests;

pub use memory::{MemoryStore, MemoryTxn};

use crate::error::InternalError;
use std::ops::Bound;

///
/// KvStore
///

pub trait KvStore: Send + Sync + 'static {
    type Txn: KvTxn;

    /// Open a transaction reading at the latest committed snapshot.
    fn begin(&self) -> Result<Self::Txn, InternalError>;
}

///
/// KvTxn
///
/// One snapshot-isolated transaction. Own writes are visible to own reads.
/// Dropping a transaction without committing discards its writes.
///

pub trait KvTxn: Send {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, InternalError>;

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), InternalError>;

    fn delete(&mut self, key: Vec<u8>) -> Result<(), InternalError>;

    /// All visible pairs within `range`, ascending by key.
    fn scan(&self, range: &KeyRange) -> Result<Vec<(Vec<u8>, Vec<u8>)>, InternalError>;

    /// Atomically publish every write, or fail without publishing any.
    fn commit(self) -> Result<(), InternalError>;

    fn abort(self);
}

///
/// KeyRange
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyRange {
    pub start: Bound<Vec<u8>>,
    pub end: Bound<Vec<u8>>,
}

impl KeyRange {
    #[must_use]
    pub const fn new(start: Bound<Vec<u8>>, end: Bound<Vec<u8>>) -> Self {
        Self { start, end }
    }

    /// Every key starting with `prefix`.
    #[must_use]
    pub fn prefix(prefix: &[u8]) -> Self {
        let end = prefix_successor(prefix).map_or(Bound::Unbounded, Bound::Excluded);

        Self {
            start: Bound::Included(prefix.to_vec()),
            end,
        }
    }

    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        let after_start = match &self.start {
            Bound::Included(s) => key >= s.as_slice(),
            Bound::Excluded(s) => key > s.as_slice(),
            Bound::Unbounded => true,
        };
        let before_end = match &self.end {
            Bound::Included(e) => key <= e.as_slice(),
            Bound::Excluded(e) => key < e.as_slice(),
            Bound::Unbounded => true,
        };

        after_start && before_end
    }

    /// Borrowed bounds suitable for `BTreeMap::range`.
    #[must_use]
    pub fn as_bounds(&self) -> (Bound<&[u8]>, Bound<&[u8]>) {
        (as_slice_bound(&self.start), as_slice_bound(&self.end))
    }

    /// Whether no key can satisfy both bounds.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match (&self.start, &self.end) {
            (Bound::Included(s), Bound::Included(e)) => s > e,
            (Bound::Included(s) | Bound::Excluded(s), Bound::Excluded(e))
            | (Bound::Excluded(s), Bound::Included(e)) => s >= e,
            _ => false,
        }
    }
}

fn as_slice_bound(bound: &Bound<Vec<u8>>) -> Bound<&[u8]> {
    match bound {
        Bound::Included(v) => Bound::Included(v.as_slice()),
        Bound::Excluded(v) => Bound::Excluded(v.as_slice()),
        Bound::Unbounded => Bound::Unbounded,
    }
}

/// Smallest key greater than every key with this prefix, if one exists.
#[must_use]
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut out = prefix.to_vec();
    while let Some(last) = out.pop() {
        if last != u8::MAX {
            out.push(last + 1);
            return Some(out);
        }
    }

    None
}
