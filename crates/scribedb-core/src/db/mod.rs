//! Insert path: allocation, row storage, index maintenance, and ranking
//! over a pluggable transactional key-value store.

pub mod allocator;
pub mod catalog;
pub(crate) mod data;
pub mod executor;
pub mod index;
pub mod rank;
pub mod response;
pub mod session;
pub mod store;

pub use catalog::{Catalog, MemoryCatalog};
pub use response::{InsertResult, Row, RowWarning};
pub use session::DbSession;

use crate::{
    coerce::SqlMode,
    db::{
        allocator::RowIdAllocator,
        index::Tokenizer,
        rank::{Bm25Params, TextRanker},
        store::KvStore,
    },
    error::InternalError,
    obs::{GlobalMetricsSink, MetricsSink},
};
use scribedb_config::EngineConfig;
use std::sync::Arc;

///
/// Db
///
/// Shared engine handle. Cloning is cheap; clones share the store,
/// the catalog, and the per-table allocators.
///

pub struct Db<S: KvStore> {
    inner: Arc<DbInner<S>>,
}

struct DbInner<S: KvStore> {
    store: Arc<S>,
    catalog: Arc<dyn Catalog>,
    allocator: RowIdAllocator<S>,
    config: EngineConfig,
    ranker: TextRanker,
    sink: Arc<dyn MetricsSink>,
}

impl<S: KvStore> Db<S> {
    /// Open an engine reporting to the process-wide metrics sink.
    pub fn new(
        store: S,
        catalog: Arc<dyn Catalog>,
        config: EngineConfig,
    ) -> Result<Self, InternalError> {
        Self::with_metrics_sink(store, catalog, config, Arc::new(GlobalMetricsSink))
    }

    pub fn with_metrics_sink(
        store: S,
        catalog: Arc<dyn Catalog>,
        config: EngineConfig,
        sink: Arc<dyn MetricsSink>,
    ) -> Result<Self, InternalError> {
        config.validate()?;

        let store = Arc::new(store);
        let allocator = RowIdAllocator::new(
            Arc::clone(&store),
            config.allocator.clone(),
            Arc::clone(&sink),
        );
        let ranker = TextRanker::new(
            Tokenizer::from_config(&config.text),
            Bm25Params::from(&config.ranking),
        );

        Ok(Self {
            inner: Arc::new(DbInner {
                store,
                catalog,
                allocator,
                config,
                ranker,
                sink,
            }),
        })
    }

    /// A session using the configured default SQL mode.
    #[must_use]
    pub fn session(&self) -> DbSession<S> {
        let mode = SqlMode {
            strict: self.inner.config.sql.strict,
        };

        DbSession::new(self.clone()).with_mode(mode)
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    #[must_use]
    pub fn catalog(&self) -> &dyn Catalog {
        self.inner.catalog.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn ranker(&self) -> &TextRanker {
        &self.inner.ranker
    }

    #[must_use]
    pub fn tokenizer(&self) -> &Tokenizer {
        self.inner.ranker.tokenizer()
    }

    #[must_use]
    pub fn allocator(&self) -> &RowIdAllocator<S> {
        &self.inner.allocator
    }

    pub(crate) fn sink(&self) -> &dyn MetricsSink {
        self.inner.sink.as_ref()
    }
}

impl<S: KvStore> Clone for Db<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
