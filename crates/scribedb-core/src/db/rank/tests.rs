use super::*;
use crate::{
    db::{
        index::on_insert,
        store::{KvStore, KvTxn, MemoryStore, key},
    },
    error::{ErrorClass, ErrorOrigin},
    model::{ColumnModel, ColumnType},
    obs::sink::RecordingSink,
    value::Value,
};

fn ranked(id: i64, score: f64) -> Ranked {
    Ranked {
        row_id: RowId::new(id),
        score,
    }
}

fn ids(rows: &[Ranked]) -> Vec<i64> {
    rows.iter().map(|r| r.row_id.get()).collect()
}

#[test]
fn idf_is_positive_and_decreases_with_document_frequency() {
    let stats = CorpusStats::new(
        10,
        50,
        [("rare".to_string(), 1), ("common".to_string(), 9)].into(),
    );

    assert!(stats.idf("common") > 0.0);
    assert!(stats.idf("rare") > stats.idf("common"));
    assert!((stats.avg_doc_len - 5.0).abs() < f64::EPSILON);
}

#[test]
fn score_is_zero_without_matching_tokens() {
    let ranker = TextRanker::default();
    let docs = ["hig", "123"];
    let query = ranker.query_tokens("f");
    let stats = CorpusStats::from_documents(docs, ranker.tokenizer(), &query);

    for doc in docs {
        assert!(ranker.score(doc, "f", &stats).abs() < f64::EPSILON);
    }
}

#[test]
fn higher_term_frequency_scores_higher() {
    let ranker = TextRanker::default();
    let docs = ["f x x", "f f x", "x x x"];
    let query = ranker.query_tokens("f");
    let stats = CorpusStats::from_documents(docs, ranker.tokenizer(), &query);

    let one = ranker.score(docs[0], "f", &stats);
    let two = ranker.score(docs[1], "f", &stats);
    assert!(two > one);
    assert!(one > 0.0);
}

#[test]
fn shorter_documents_score_higher_for_equal_tf() {
    let ranker = TextRanker::default();
    let docs = ["f", "f x x x x x"];
    let query = ranker.query_tokens("f");
    let stats = CorpusStats::from_documents(docs, ranker.tokenizer(), &query);

    assert!(ranker.score(docs[0], "f", &stats) > ranker.score(docs[1], "f", &stats));
}

#[test]
fn index_scores_match_text_scores() {
    let table = TableModel::builder(1, "t1")
        .column(ColumnModel::new("b", ColumnType::Text))
        .index(IndexModel::inverted(1, "idx_b", "b"))
        .build();
    let index = table.indexes[0].clone();
    let ranker = TextRanker::default();
    let docs = ["alpha beta", "beta beta gamma", "delta"];

    let mut txn = MemoryStore::new().begin().expect("begin");
    for (i, doc) in docs.iter().enumerate() {
        on_insert(
            &mut txn,
            &table,
            RowId::new(i as i64 + 1),
            &[Value::from(*doc)],
            ranker.tokenizer(),
            &RecordingSink::default(),
        )
        .expect("index row");
    }

    let scores = ranker
        .score_index(&txn, &table, &index, "beta alpha")
        .expect("scores");
    let query = ranker.query_tokens("beta alpha");
    let stats = CorpusStats::from_documents(docs, ranker.tokenizer(), &query);

    assert_eq!(scores.len(), 2);
    for (row, doc) in [(1, docs[0]), (2, docs[1])] {
        let from_index = scores[&RowId::new(row)];
        let from_text = ranker.score(doc, "beta alpha", &stats);
        assert!((from_index - from_text).abs() < 1e-9, "row {row}");
    }
    assert!(!scores.contains_key(&RowId::new(3)));

    for row in 1..=2 {
        let single = ranker
            .score_row(&txn, &table, &index, RowId::new(row), "beta alpha")
            .expect("row score");
        assert!((single - scores[&RowId::new(row)]).abs() < 1e-12, "row {row}");
    }
    for row in [3, 9] {
        let single = ranker
            .score_row(&txn, &table, &index, RowId::new(row), "beta alpha")
            .expect("row score");
        assert!(single.abs() < f64::EPSILON, "row {row}");
    }
}

#[test]
fn posting_without_length_entry_is_index_corruption() {
    let table = TableModel::builder(1, "t1")
        .column(ColumnModel::new("b", ColumnType::Text))
        .index(IndexModel::inverted(1, "idx_b", "b"))
        .build();
    let index = table.indexes[0].clone();
    let ranker = TextRanker::default();

    let mut txn = MemoryStore::new().begin().expect("begin");
    txn.put(
        key::posting_key(table.id, index.id, "beta", RowId::new(4)),
        inverted::encode_tf(1),
    )
    .expect("put");

    let err = ranker
        .score_index(&txn, &table, &index, "beta")
        .unwrap_err();
    assert_eq!(err.class, ErrorClass::Corruption);
    assert_eq!(err.origin, ErrorOrigin::Index);
}

#[test]
fn top_k_orders_by_score_then_row_id() {
    let rows = [
        ranked(4, 0.5),
        ranked(2, 1.5),
        ranked(1, 0.5),
        ranked(3, 1.5),
        ranked(5, 0.0),
    ];

    assert_eq!(ids(&top_k(rows, 3)), vec![2, 3, 1]);
    assert_eq!(ids(&top_k(rows, 10)), vec![2, 3, 1, 4, 5]);
    assert!(top_k(rows, 0).is_empty());
}

#[test]
fn top_one_tie_prefers_lowest_row_id() {
    let rows = [ranked(2, 0.0), ranked(1, 0.0)];
    assert_eq!(ids(&top_k(rows, 1)), vec![1]);
}
