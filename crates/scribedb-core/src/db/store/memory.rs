use crate::{
    db::store::{KeyRange, KvStore, KvTxn, key},
    error::InternalError,
};
use parking_lot::{Mutex, RwLock};
use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

///
/// Version
/// One committed value of a key; `None` marks a deletion.
///

#[derive(Clone, Debug)]
struct Version {
    commit_ts: u64,
    value: Option<Vec<u8>>,
}

#[derive(Debug, Default)]
struct Inner {
    versions: RwLock<BTreeMap<Vec<u8>, Vec<Version>>>,
    clock: AtomicU64,
    // Open snapshot timestamps and how many transactions hold each.
    snapshots: Mutex<BTreeMap<u64, usize>>,
}

impl Inner {
    fn open_snapshot(&self) -> u64 {
        let mut snapshots = self.snapshots.lock();
        let ts = self.clock.load(Ordering::Acquire);
        *snapshots.entry(ts).or_insert(0) += 1;

        ts
    }

    fn close_snapshot(&self, ts: u64) {
        let mut snapshots = self.snapshots.lock();
        if let Some(count) = snapshots.get_mut(&ts) {
            *count -= 1;
            if *count == 0 {
                snapshots.remove(&ts);
            }
        }
    }

    // Publish `commit_ts` and return the oldest timestamp any snapshot can
    // still read at. Both happen under the snapshot lock so a concurrent
    // begin is either registered or sees the new clock.
    fn publish(&self, commit_ts: u64) -> u64 {
        let snapshots = self.snapshots.lock();
        self.clock.store(commit_ts, Ordering::Release);

        snapshots.keys().next().copied().unwrap_or(commit_ts)
    }

    fn read_at(&self, key: &[u8], ts: u64) -> Option<Vec<u8>> {
        let versions = self.versions.read();

        versions
            .get(key)?
            .iter()
            .rev()
            .find(|v| v.commit_ts <= ts)
            .and_then(|v| v.value.clone())
    }
}

///
/// MemoryStore
///
/// Multi-version in-memory store with snapshot isolation.
/// Write-write conflicts are detected at commit (first committer wins).
/// Each commit trims the chains it wrote to the versions still readable by
/// the oldest open snapshot.
///

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys in the latest committed state.
    #[must_use]
    pub fn len(&self) -> usize {
        let ts = self.inner.clock.load(Ordering::Acquire);
        let versions = self.inner.versions.read();

        versions
            .values()
            .filter(|chain| {
                chain
                    .iter()
                    .rev()
                    .find(|v| v.commit_ts <= ts)
                    .is_some_and(|v| v.value.is_some())
            })
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of retained versions of `key`, tombstones included.
    #[must_use]
    pub fn version_count(&self, key: &[u8]) -> usize {
        self.inner.versions.read().get(key).map_or(0, Vec::len)
    }
}

impl KvStore for MemoryStore {
    type Txn = MemoryTxn;

    fn begin(&self) -> Result<Self::Txn, InternalError> {
        Ok(MemoryTxn {
            inner: Arc::clone(&self.inner),
            start_ts: self.inner.open_snapshot(),
            writes: BTreeMap::new(),
            registered: true,
        })
    }
}

///
/// MemoryTxn
///

#[derive(Debug)]
pub struct MemoryTxn {
    inner: Arc<Inner>,
    start_ts: u64,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    registered: bool,
}

impl MemoryTxn {
    fn release(&mut self) {
        if std::mem::take(&mut self.registered) {
            self.inner.close_snapshot(self.start_ts);
        }
    }
}

impl KvTxn for MemoryTxn {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, InternalError> {
        if let Some(buffered) = self.writes.get(key) {
            return Ok(buffered.clone());
        }

        Ok(self.inner.read_at(key, self.start_ts))
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), InternalError> {
        self.writes.insert(key, Some(value));
        Ok(())
    }

    fn delete(&mut self, key: Vec<u8>) -> Result<(), InternalError> {
        self.writes.insert(key, None);
        Ok(())
    }

    fn scan(&self, range: &KeyRange) -> Result<Vec<(Vec<u8>, Vec<u8>)>, InternalError> {
        if range.is_empty() {
            return Ok(Vec::new());
        }

        let mut visible = BTreeMap::new();
        {
            let versions = self.inner.versions.read();
            for (k, chain) in versions.range::<[u8], _>(range.as_bounds()) {
                let value = chain
                    .iter()
                    .rev()
                    .find(|v| v.commit_ts <= self.start_ts)
                    .and_then(|v| v.value.clone());
                if let Some(value) = value {
                    visible.insert(k.clone(), value);
                }
            }
        }

        for (k, buffered) in self.writes.range::<[u8], _>(range.as_bounds()) {
            match buffered {
                Some(value) => {
                    visible.insert(k.clone(), value.clone());
                }
                None => {
                    visible.remove(k);
                }
            }
        }

        Ok(visible.into_iter().collect())
    }

    fn commit(mut self) -> Result<(), InternalError> {
        if self.writes.is_empty() {
            return Ok(());
        }

        let inner = Arc::clone(&self.inner);
        let mut versions = inner.versions.write();

        for k in self.writes.keys() {
            let newer = versions
                .get(k)
                .and_then(|chain| chain.last())
                .is_some_and(|v| v.commit_ts > self.start_ts);
            if newer {
                return Err(InternalError::store_conflict(key::render(k)));
            }
        }

        // Past the conflict check this snapshot reads nothing more.
        self.release();

        // The clock advances under the write lock.
        let commit_ts = inner.clock.load(Ordering::Acquire) + 1;
        let mut written = Vec::with_capacity(self.writes.len());
        for (k, value) in std::mem::take(&mut self.writes) {
            versions
                .entry(k.clone())
                .or_default()
                .push(Version { commit_ts, value });
            written.push(k);
        }
        let horizon = inner.publish(commit_ts);

        for k in &written {
            if let Some(chain) = versions.get_mut(k) {
                prune_chain(chain, horizon);
                if chain.is_empty() {
                    versions.remove(k);
                }
            }
        }

        Ok(())
    }

    fn abort(self) {}
}

impl Drop for MemoryTxn {
    fn drop(&mut self) {
        self.release();
    }
}

// Drop versions no snapshot at or after `horizon` can read: everything older
// than the newest version committed at or before it. A lone tombstone at the
// floor is dropped too.
fn prune_chain(chain: &mut Vec<Version>, horizon: u64) {
    let Some(floor) = chain.iter().rposition(|v| v.commit_ts <= horizon) else {
        return;
    };
    chain.drain(..floor);

    if let [only] = chain.as_slice()
        && only.value.is_none()
    {
        chain.clear();
    }
}
