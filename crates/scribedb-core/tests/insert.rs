mod common;

use common::{ids, lit, open};
use scribedb_core::prelude::*;

fn t_ab() -> TableModel {
    TableModel::builder(1, "t")
        .column(ColumnModel::new("a", ColumnType::bigint()))
        .column(ColumnModel::new("b", ColumnType::VarChar(4)))
        .build()
}

#[test]
fn wrong_value_leaves_table_empty() {
    let db = open(vec![t_ab()]);
    let session = db.session();

    let err = session
        .insert(
            "t",
            &["a"],
            vec![vec![lit(1)], vec![lit("asfasdfsajhlkhlksdaf")]],
        )
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::TruncatedWrongValueForField);
    assert!(err.to_string().contains("asfasdfsajhlkhlksdaf"));
    assert_eq!(session.count_rows("t").expect("count"), 0);
}

#[test]
fn lenient_session_stores_lossy_values_with_warnings() {
    let db = open(vec![t_ab()]);
    let mut session = db.session();
    session.set_strict(false);

    let result = session
        .insert("t", &["a", "b"], vec![vec![lit("7x"), lit("abcdef")]])
        .expect("lenient insert");

    assert_eq!(result.rows_affected, 1);
    assert_eq!(result.warnings.len(), 2);
    assert!(result.warnings.iter().all(|w| w.row == 1));

    let rows = session.scan_rows("t").expect("scan");
    assert_eq!(rows[0].values, vec![Value::Int(7), Value::from("abcd")]);
}

#[test]
fn strict_session_rejects_over_length_text() {
    let db = open(vec![t_ab()]);

    let err = db
        .session()
        .insert("t", &["b"], vec![vec![lit("abcdef")]])
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::DataTooLong);
}

#[test]
fn timestamp_and_datetime_without_seconds() {
    let db = open(vec![
        TableModel::builder(2, "times")
            .column(ColumnModel::new("ts", ColumnType::Timestamp))
            .column(ColumnModel::new("dt", ColumnType::DateTime))
            .build(),
    ]);
    let session = db.session();

    session
        .insert(
            "times",
            &[],
            vec![vec![lit("2022-05-01 03:00"), lit("2022-05-01 03:00")]],
        )
        .expect("partial times are valid");

    let rows = session.scan_rows("times").expect("scan");
    let stored = rows[0].values[0].as_datetime().expect("timestamp value");
    assert_eq!(stored.and_utc().timestamp() % 60, 0);

    let rendered: Vec<String> = rows[0].values.iter().map(ToString::to_string).collect();
    assert_eq!(rendered, vec!["2022-05-01 03:00:00", "2022-05-01 03:00:00"]);

    let err = session
        .insert("times", &["ts"], vec![vec![lit("2022-13-01 03:00")]])
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TimeParseError);
}

#[test]
fn explicit_row_ids_and_duplicates() {
    let db = open(vec![t_ab()]);
    let session = db.session();

    let result = session
        .insert("t", &["_rowid", "a"], vec![vec![lit(10), lit(1)]])
        .expect("explicit id");
    assert_eq!(result.last_insert_id, Some(RowId::new(10)));

    let err = session
        .insert("t", &["_rowid", "a"], vec![vec![lit(10), lit(2)]])
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::DuplicateKey);

    let result = session
        .insert("t", &["a"], vec![vec![lit(3)], vec![lit(4)]])
        .expect("implicit ids");
    assert_eq!(result.first_insert_id, Some(RowId::new(11)));
    assert_eq!(result.last_insert_id, Some(RowId::new(12)));

    let rows = session.scan_rows("t").expect("scan");
    assert_eq!(ids(&rows), vec![10, 11, 12]);

    let row = session
        .get_row("t", RowId::new(11))
        .expect("get")
        .expect("row 11 exists");
    let table = session.table("t").expect("table");
    assert_eq!(row.get(&table, "_rowid"), Some(Value::Int(11)));
    assert_eq!(row.get(&table, "a"), Some(Value::Int(3)));
}

#[test]
fn duplicate_unique_key_aborts_statement() {
    let db = open(vec![
        TableModel::builder(3, "u")
            .column(ColumnModel::new("k", ColumnType::int()))
            .index(IndexModel::ordered(1, "uk_k", &["k"], true))
            .build(),
    ]);
    let session = db.session();

    session
        .insert("u", &["k"], vec![vec![lit(1)]])
        .expect("first insert");

    let err = session
        .insert("u", &["k"], vec![vec![lit(2)], vec![lit(1)]])
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::DuplicateKey);
    assert!(err.to_string().contains("Duplicate entry '1' for key 'uk_k'"));
    assert_eq!(session.count_rows("u").expect("count"), 1);

    // NULLs never collide on a unique index.
    session
        .insert("u", &["k"], vec![vec![Literal::Null], vec![Literal::Null]])
        .expect("nulls are distinct");
    assert_eq!(session.count_rows("u").expect("count"), 3);
}

#[test]
fn equality_lookup_uses_index_and_scan_alike() {
    let db = open(vec![
        TableModel::builder(4, "e")
            .column(ColumnModel::new("a", ColumnType::int()))
            .column(ColumnModel::new("b", ColumnType::int()))
            .index(IndexModel::ordered(1, "key_a", &["a"], false))
            .build(),
    ]);
    let session = db.session();

    session
        .insert(
            "e",
            &["a", "b"],
            vec![
                vec![lit(1), lit(5)],
                vec![lit(2), lit(5)],
                vec![lit(1), lit(6)],
            ],
        )
        .expect("insert");

    let by_index = session.row_ids_where_eq("e", "a", &lit(1)).expect("indexed");
    assert_eq!(by_index, vec![RowId::new(1), RowId::new(3)]);

    let by_scan = session.row_ids_where_eq("e", "b", &lit("5")).expect("scan");
    assert_eq!(by_scan, vec![RowId::new(1), RowId::new(2)]);

    assert!(session
        .row_ids_where_eq("e", "a", &Literal::Null)
        .expect("null")
        .is_empty());
    assert_eq!(
        session.row_ids_where_eq("e", "_rowid", &lit(2)).expect("rowid"),
        vec![RowId::new(2)]
    );

    let ranged = session
        .lookup_ordered(
            "e",
            "key_a",
            &OrderedPredicate::Range {
                lower: std::ops::Bound::Included(vec![Value::Int(2)]),
                upper: std::ops::Bound::Unbounded,
            },
        )
        .expect("range");
    assert_eq!(ranged, vec![RowId::new(2)]);
}
