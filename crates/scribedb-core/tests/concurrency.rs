mod common;

use common::{lit, open};
use scribedb_core::prelude::*;
use std::{collections::BTreeMap, thread};

const THREADS: i64 = 5;
const STATEMENTS: i64 = 10;
const ROWS: i64 = 21;

#[test]
fn concurrent_multi_row_inserts_get_contiguous_ids() {
    let db = open(vec![
        TableModel::builder(1, "t1")
            .column(ColumnModel::new("a", ColumnType::int()))
            .column(ColumnModel::new("b", ColumnType::int()))
            .index(IndexModel::ordered(1, "key_a", &["a"], false))
            .build(),
    ]);

    let handles: Vec<_> = (0..THREADS)
        .map(|thread_no| {
            let db = db.clone();
            thread::spawn(move || {
                let session = db.session();
                let mut results = Vec::new();

                for stmt in 0..STATEMENTS {
                    let tag = thread_no * 100 + stmt;
                    let rows = (0..ROWS).map(|pos| vec![lit(tag), lit(pos)]).collect();
                    let result = session
                        .insert("t1", &["a", "b"], rows)
                        .expect("insert statement");
                    results.push((tag, result));
                }

                results
            })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.extend(handle.join().expect("worker thread"));
    }

    let session = db.session();
    let rows = session.scan_rows("t1").expect("scan");
    assert_eq!(rows.len(), (THREADS * STATEMENTS * ROWS) as usize);

    let mut by_tag: BTreeMap<i64, Vec<(i64, i64)>> = BTreeMap::new();
    for row in &rows {
        let (Some(tag), Some(pos)) = (row.values[0].as_int(), row.values[1].as_int()) else {
            panic!("unexpected row {row:?}");
        };
        by_tag.entry(tag).or_default().push((pos, row.row_id.get()));
    }

    for (tag, result) in results {
        assert_eq!(result.rows_affected, ROWS as u64);

        let mut stmt_rows = by_tag.remove(&tag).expect("statement rows present");
        stmt_rows.sort_unstable();

        let first = result.first_insert_id.expect("implicit ids").get();
        let expected: Vec<(i64, i64)> = (0..ROWS).map(|pos| (pos, first + pos)).collect();
        assert_eq!(stmt_rows, expected, "statement {tag}");
        assert_eq!(result.last_insert_id.map(RowId::get), Some(first + ROWS - 1));

        let indexed = session
            .row_ids_where_eq("t1", "a", &lit(tag))
            .expect("index lookup");
        assert_eq!(indexed.len(), ROWS as usize);
    }
    assert!(by_tag.is_empty());
}
