//! Core engine for ScribeDB: the INSERT path over a transactional key-value
//! store, with row-id allocation, type coercion, secondary and full-text
//! index maintenance, and BM25 ranking.

pub mod coerce;
pub mod db;
pub mod error;
pub mod model;
pub mod obs;
pub mod serialize;
pub mod types;
pub mod value;

pub use scribedb_config as config;

///
/// Prelude
///
/// Domain vocabulary plus the handles needed to open a database and run
/// statements against it.
///

pub mod prelude {
    pub use crate::{
        coerce::SqlMode,
        db::{
            Db, DbSession, InsertResult, MemoryCatalog, Row,
            executor::{Expr, InsertPlan},
            index::{MatchMode, OrderedPredicate},
            store::MemoryStore,
        },
        error::{ErrorCode, InternalError},
        model::{ColumnModel, ColumnType, IndexModel, TableModel},
        types::{RowId, TableId},
        value::{Literal, Value},
    };
    pub use scribedb_config::EngineConfig;
}
