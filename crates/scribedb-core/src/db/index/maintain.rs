use crate::{
    db::{
        index::{IndexError, Tokenizer, inverted, ordered::EntryKey},
        store::{KvTxn, key},
    },
    error::InternalError,
    model::{IndexKind, IndexModel, TableModel},
    obs::{MetricsEvent, MetricsSink},
    types::RowId,
    value::Value,
};

///
/// IndexDelta
/// Entries written for one or more rows.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct IndexDelta {
    pub ordered: u64,
    pub postings: u64,
}

impl IndexDelta {
    pub const fn merge(&mut self, other: Self) {
        self.ordered += other.ordered;
        self.postings += other.postings;
    }
}

/// Write every index entry for a freshly inserted row.
///
/// `values` is the coerced row in declared column order. Entries go into
/// `txn` alongside the row, so they commit or vanish together.
pub fn on_insert<T: KvTxn>(
    txn: &mut T,
    table: &TableModel,
    row_id: RowId,
    values: &[Value],
    tokenizer: &Tokenizer,
    sink: &dyn MetricsSink,
) -> Result<IndexDelta, InternalError> {
    let mut delta = IndexDelta::default();

    for index in &table.indexes {
        let columns = index_values(table, index, values)?;

        match index.kind {
            IndexKind::Ordered { unique } => {
                insert_ordered(txn, table, index, row_id, &columns, unique, sink)?;
                delta.ordered += 1;
            }
            IndexKind::Inverted => {
                delta.postings += insert_postings(txn, table, index, row_id, &columns, tokenizer)?;
            }
        }
    }

    Ok(delta)
}

fn index_values(
    table: &TableModel,
    index: &IndexModel,
    values: &[Value],
) -> Result<Vec<Value>, InternalError> {
    index
        .columns
        .iter()
        .map(|name| {
            table
                .column_position(name)
                .and_then(|pos| values.get(pos))
                .cloned()
                .ok_or_else(|| {
                    InternalError::executor_invariant(format!(
                        "index '{}' column '{name}' missing from row of table '{}'",
                        index.name, table.name
                    ))
                })
        })
        .collect()
}

fn insert_ordered<T: KvTxn>(
    txn: &mut T,
    table: &TableModel,
    index: &IndexModel,
    row_id: RowId,
    values: &[Value],
    unique: bool,
    sink: &dyn MetricsSink,
) -> Result<(), InternalError> {
    let entry = EntryKey::new(table.id, index.id, values, unique);
    let storage_key = entry.storage_key(row_id);

    if entry.is_distinct() && txn.get(&storage_key)?.is_some() {
        sink.record(MetricsEvent::UniqueViolation { table: table.id });

        let rendered = values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("-");
        return Err(IndexError::DuplicateKey {
            index: index.name.clone(),
            key: rendered,
        }
        .into());
    }

    txn.put(storage_key, key::ordered_i64_bytes(row_id.get()).to_vec())
}

// Returns the number of posting entries written.
fn insert_postings<T: KvTxn>(
    txn: &mut T,
    table: &TableModel,
    index: &IndexModel,
    row_id: RowId,
    values: &[Value],
    tokenizer: &Tokenizer,
) -> Result<u64, InternalError> {
    let Some(text) = values.first().and_then(Value::searchable_text) else {
        return Ok(0);
    };

    let freqs = tokenizer.term_frequencies(&text);
    let doc_len: u64 = freqs.values().map(|tf| u64::from(*tf)).sum();
    let distinct = freqs.len() as u64;

    for (token, tf) in freqs {
        txn.put(
            key::posting_key(table.id, index.id, &token, row_id),
            inverted::encode_tf(tf),
        )?;
    }
    txn.put(
        key::doc_len_key(table.id, index.id, row_id),
        doc_len.to_be_bytes().to_vec(),
    )?;

    Ok(distinct)
}
