use crate::{
    db::store::{KeyRange, KvStore, KvTxn, MemoryStore, MemoryTxn},
    error::InternalError,
};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

///
/// FlakyStore
/// MemoryStore whose next `n` commits fail with a transient error.
///

#[derive(Clone, Debug, Default)]
pub(crate) struct FlakyStore {
    inner: MemoryStore,
    failures: Arc<AtomicUsize>,
}

impl FlakyStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_next_commits(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub(crate) const fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

impl KvStore for FlakyStore {
    type Txn = FlakyTxn;

    fn begin(&self) -> Result<Self::Txn, InternalError> {
        Ok(FlakyTxn {
            inner: self.inner.begin()?,
            failures: Arc::clone(&self.failures),
        })
    }
}

#[derive(Debug)]
pub(crate) struct FlakyTxn {
    inner: MemoryTxn,
    failures: Arc<AtomicUsize>,
}

impl KvTxn for FlakyTxn {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, InternalError> {
        self.inner.get(key)
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), InternalError> {
        self.inner.put(key, value)
    }

    fn delete(&mut self, key: Vec<u8>) -> Result<(), InternalError> {
        self.inner.delete(key)
    }

    fn scan(&self, range: &KeyRange) -> Result<Vec<(Vec<u8>, Vec<u8>)>, InternalError> {
        self.inner.scan(range)
    }

    fn commit(self) -> Result<(), InternalError> {
        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            self.inner.abort();
            return Err(InternalError::store_transient("injected commit failure"));
        }

        self.inner.commit()
    }

    fn abort(self) {
        self.inner.abort();
    }
}
