#![allow(dead_code)]

use scribedb_core::prelude::*;
use std::sync::Arc;

/// Open an in-memory database holding `tables`.
pub fn open(tables: Vec<TableModel>) -> Db<MemoryStore> {
    open_with(MemoryStore::new(), tables, EngineConfig::default())
}

pub fn open_with<S: scribedb_core::db::store::KvStore>(
    store: S,
    tables: Vec<TableModel>,
    config: EngineConfig,
) -> Db<S> {
    let catalog = MemoryCatalog::new();
    for table in tables {
        catalog.create_table(table).expect("create table");
    }

    Db::new(store, Arc::new(catalog), config).expect("open db")
}

pub fn lit(v: impl Into<Literal>) -> Literal {
    v.into()
}

pub fn ids(rows: &[Row]) -> Vec<i64> {
    rows.iter().map(|r| r.row_id.get()).collect()
}
