use super::*;
use crate::{
    coerce::SqlMode,
    db::{Db, MemoryCatalog, store::MemoryStore},
    error::{ErrorClass, ErrorCode},
    model::{ColumnModel, ColumnType, IndexModel, TableModel},
    obs::{MetricsEvent, StatementOutcome, sink::RecordingSink},
    types::{RowId, TableId},
    value::{Literal, Value},
};
use scribedb_config::EngineConfig;
use std::sync::Arc;

const T1: TableId = TableId::new(1);

fn setup() -> (Db<MemoryStore>, Arc<RecordingSink>) {
    let catalog = MemoryCatalog::new();
    catalog
        .create_table(
            TableModel::builder(1, "t1")
                .column(ColumnModel::new("a", ColumnType::int()))
                .column(ColumnModel::new("b", ColumnType::VarChar(8)).with_default("dflt"))
                .column(ColumnModel::new("c", ColumnType::Text))
                .index(IndexModel::ordered(1, "uk_a", &["a"], true))
                .index(IndexModel::inverted(2, "ft_c", "c"))
                .build(),
        )
        .expect("create t1");

    let sink = Arc::new(RecordingSink::default());
    let db = Db::with_metrics_sink(
        MemoryStore::new(),
        Arc::new(catalog),
        EngineConfig::default(),
        Arc::clone(&sink) as Arc<dyn crate::obs::MetricsSink>,
    )
    .expect("open db");

    (db, sink)
}

fn rows(db: &Db<MemoryStore>) -> Vec<(i64, Vec<Value>)> {
    db.session()
        .scan_rows("t1")
        .expect("scan")
        .into_iter()
        .map(|r| (r.row_id.get(), r.values))
        .collect()
}

#[test]
fn implicit_ids_are_contiguous_and_reported() {
    let (db, _) = setup();
    let plan = InsertPlan::new(T1)
        .columns(&["a"])
        .row([10])
        .row([20])
        .row([30]);

    let result = InsertExecutor::new(&db, SqlMode::STRICT)
        .execute(&plan)
        .expect("insert");

    assert_eq!(result.rows_affected, 3);
    assert_eq!(result.first_insert_id, Some(RowId::new(1)));
    assert_eq!(result.last_insert_id, Some(RowId::new(3)));
    assert!(result.warnings.is_empty());

    let ids: Vec<i64> = rows(&db).into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn omitted_columns_take_default_or_null() {
    let (db, _) = setup();
    let plan = InsertPlan::new(T1)
        .columns(&["a", "b"])
        .row([Expr::from(1), Expr::Default]);

    InsertExecutor::new(&db, SqlMode::STRICT)
        .execute(&plan)
        .expect("insert");

    let stored = rows(&db);
    assert_eq!(
        stored[0].1,
        vec![Value::Int(1), Value::from("dflt"), Value::Null]
    );
}

#[test]
fn failing_row_aborts_whole_statement() {
    let (db, sink) = setup();
    let plan = InsertPlan::new(T1)
        .columns(&["a"])
        .row([Expr::from(1)])
        .row([Expr::from("not a number")]);

    let err = InsertExecutor::new(&db, SqlMode::STRICT)
        .execute(&plan)
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::TruncatedWrongValueForField);
    assert!(err.message.starts_with("row 2:"));
    assert!(rows(&db).is_empty());
    assert!(sink.events().contains(&MetricsEvent::InsertFinish {
        table: T1,
        outcome: StatementOutcome::Aborted,
        rows: 0,
        warnings: 0,
    }));
}

#[test]
fn lenient_mode_collects_row_warnings() {
    let (db, _) = setup();
    let plan = InsertPlan::new(T1)
        .columns(&["a", "b"])
        .row([Expr::from(1), Expr::from("short")])
        .row([Expr::from("12abc"), Expr::from("much too long")]);

    let result = InsertExecutor::new(&db, SqlMode::LENIENT)
        .execute(&plan)
        .expect("lenient insert");

    let warned_rows: Vec<usize> = result.warnings.iter().map(|w| w.row).collect();
    assert_eq!(warned_rows, vec![2, 2]);

    let stored = rows(&db);
    assert_eq!(stored[1].1[0], Value::Int(12));
    assert_eq!(stored[1].1[1], Value::from("much too"));
}

#[test]
fn explicit_row_id_is_kept_and_rebases_allocator() {
    let (db, _) = setup();
    let executor = InsertExecutor::new(&db, SqlMode::STRICT);

    let result = executor
        .execute(&InsertPlan::new(T1).columns(&["_rowid", "a"]).row([100, 1]))
        .expect("explicit id");
    assert_eq!(result.first_insert_id, None);
    assert_eq!(result.last_insert_id, Some(RowId::new(100)));

    let result = executor
        .execute(&InsertPlan::new(T1).columns(&["a"]).row([2]))
        .expect("implicit id");
    assert_eq!(result.first_insert_id, Some(RowId::new(101)));
}

#[test]
fn duplicate_row_id_is_duplicate_key() {
    let (db, sink) = setup();
    let executor = InsertExecutor::new(&db, SqlMode::STRICT);

    executor
        .execute(&InsertPlan::new(T1).columns(&["_rowid", "a"]).row([5, 1]))
        .expect("first");
    let err = executor
        .execute(&InsertPlan::new(T1).columns(&["_rowid", "a"]).row([5, 2]))
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::DuplicateKey);
    assert!(err.message.contains("PRIMARY"));
    assert!(sink
        .events()
        .contains(&MetricsEvent::UniqueViolation { table: T1 }));
}

#[test]
fn non_positive_row_id_is_out_of_range() {
    let (db, _) = setup();
    let err = InsertExecutor::new(&db, SqlMode::LENIENT)
        .execute(&InsertPlan::new(T1).columns(&["_rowid", "a"]).row([0, 1]))
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::DataOutOfRange);
    assert!(err.message.starts_with("row 1:"));
}

#[test]
fn unique_violation_within_one_statement() {
    let (db, _) = setup();
    let err = InsertExecutor::new(&db, SqlMode::STRICT)
        .execute(&InsertPlan::new(T1).columns(&["a"]).row([7]).row([7]))
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::DuplicateKey);
    assert!(err.message.starts_with("row 2:"));
    assert!(err.message.contains("uk_a"));
    assert!(rows(&db).is_empty());
}

#[test]
fn column_list_errors_are_rejected_before_writing() {
    let (db, _) = setup();
    let executor = InsertExecutor::new(&db, SqlMode::STRICT);

    let err = executor
        .execute(&InsertPlan::new(T1).columns(&["zz"]).row([1]))
        .unwrap_err();
    assert_eq!(err.class, ErrorClass::NotFound);

    let err = executor
        .execute(&InsertPlan::new(T1).columns(&["a", "A"]).row([1, 2]))
        .unwrap_err();
    assert_eq!(err.class, ErrorClass::Unsupported);

    let err = executor
        .execute(&InsertPlan::new(T1).columns(&["a", "b"]).row([1]))
        .unwrap_err();
    assert!(err.message.starts_with("row 1:"));
}

#[test]
fn committed_insert_reports_index_delta() {
    let (db, sink) = setup();
    InsertExecutor::new(&db, SqlMode::STRICT)
        .execute(
            &InsertPlan::new(T1)
                .columns(&["a", "c"])
                .row([Expr::from(1), Expr::from("red fox red")]),
        )
        .expect("insert");

    let events = sink.events();
    assert!(events.contains(&MetricsEvent::IndexDelta {
        table: T1,
        ordered: 1,
        postings: 2,
    }));
    assert!(events.contains(&MetricsEvent::InsertFinish {
        table: T1,
        outcome: StatementOutcome::Committed,
        rows: 1,
        warnings: 0,
    }));
}

#[test]
fn explicit_null_row_id_takes_allocated_id() {
    let (db, _) = setup();
    let result = InsertExecutor::new(&db, SqlMode::STRICT)
        .execute(
            &InsertPlan::new(T1)
                .columns(&["_rowid", "a"])
                .row([Expr::Literal(Literal::Null), Expr::from(3)]),
        )
        .expect("insert");

    assert_eq!(result.first_insert_id, Some(RowId::new(1)));
}

#[test]
fn explicit_ids_below_and_above_cached_block_are_never_reallocated() {
    let (db, _) = setup();
    let executor = InsertExecutor::new(&db, SqlMode::STRICT);

    // Claims the first cached block.
    executor
        .execute(&InsertPlan::new(T1).columns(&["a"]).row([1]))
        .expect("warm");
    executor
        .execute(
            &InsertPlan::new(T1)
                .columns(&["_rowid", "a"])
                .row([5, 2])
                .row([100, 3]),
        )
        .expect("explicit ids");

    let result = executor
        .execute(
            &InsertPlan::new(T1)
                .columns(&["a"])
                .row([4])
                .row([5])
                .row([6])
                .row([7])
                .row([8]),
        )
        .expect("implicit ids skip explicit ones");
    assert_eq!(result.first_insert_id, Some(RowId::new(6)));
    assert_eq!(result.last_insert_id, Some(RowId::new(10)));

    let ids: Vec<i64> = rows(&db).into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec![1, 5, 6, 7, 8, 9, 10, 100]);

    let result = executor
        .execute(&InsertPlan::new(T1).columns(&["a"]).row([9]))
        .expect("past the explicit tail");
    assert_ne!(result.first_insert_id, Some(RowId::new(100)));
}

#[test]
fn mixed_explicit_and_implicit_rows_in_one_statement() {
    let (db, _) = setup();
    let executor = InsertExecutor::new(&db, SqlMode::STRICT);

    executor
        .execute(&InsertPlan::new(T1).columns(&["a"]).row([1]))
        .expect("warm");
    let result = executor
        .execute(
            &InsertPlan::new(T1)
                .columns(&["_rowid", "a"])
                .row([Expr::from(5), Expr::from(2)])
                .row([Expr::Literal(Literal::Null), Expr::from(3)])
                .row([Expr::from(100), Expr::from(4)])
                .row([Expr::Literal(Literal::Null), Expr::from(5)]),
        )
        .expect("mixed insert");

    assert_eq!(result.rows_affected, 4);
    assert_eq!(result.first_insert_id, Some(RowId::new(6)));

    let ids: Vec<i64> = rows(&db).into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec![1, 5, 6, 7, 100]);
}
