mod common;

use common::{lit, open_with};
use scribedb_core::{error::ErrorClass, prelude::*};
use std::sync::Arc;

#[test]
fn toml_config_drives_session_mode_and_allocator() {
    let config = EngineConfig::from_toml_str(
        r#"
        [sql]
        strict = false

        [allocator]
        initial_step = 2
        max_step = 4
        "#,
    )
    .expect("valid config");

    let db = open_with(
        MemoryStore::new(),
        vec![
            TableModel::builder(1, "t")
                .column(ColumnModel::new("a", ColumnType::int()))
                .build(),
        ],
        config,
    );
    let session = db.session();
    assert!(!session.mode().strict);

    let result = session
        .insert("t", &["a"], vec![vec![lit("5 apples")]])
        .expect("lenient by config");
    assert_eq!(result.warnings.len(), 1);

    for _ in 0..3 {
        session
            .insert("t", &["a"], vec![vec![lit(1)]])
            .expect("insert");
    }
    let ids: Vec<i64> = session
        .scan_rows("t")
        .expect("scan")
        .iter()
        .map(|r| r.row_id.get())
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

#[test]
fn invalid_config_is_rejected_on_open() {
    let mut config = EngineConfig::default();
    config.allocator.initial_step = 0;

    let err = Db::new(MemoryStore::new(), Arc::new(MemoryCatalog::new()), config)
        .err()
        .expect("invalid config");

    assert_eq!(err.class, ErrorClass::InvalidInput);
    assert!(err.message.contains("allocator.initial_step"));
}
