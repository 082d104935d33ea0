use crate::{
    db::store::{KeyRange, KvTxn, key},
    error::InternalError,
    model::{IndexModel, TableModel},
    types::RowId,
};

///
/// Posting
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Posting {
    pub row_id: RowId,
    pub tf: u32,
}

pub(crate) fn encode_tf(tf: u32) -> Vec<u8> {
    tf.to_be_bytes().to_vec()
}

fn decode_tf(key: &[u8], value: &[u8]) -> Result<u32, InternalError> {
    let bytes: [u8; 4] = value.try_into().map_err(|_| {
        InternalError::index_corruption(format!(
            "posting {} has a {}-byte term frequency",
            key::render(key),
            value.len()
        ))
    })?;

    Ok(u32::from_be_bytes(bytes))
}

/// Posting list of `token`, ascending by row id.
pub(crate) fn postings<T: KvTxn>(
    txn: &T,
    table: &TableModel,
    index: &IndexModel,
    token: &str,
) -> Result<Vec<Posting>, InternalError> {
    let range = KeyRange::prefix(&key::posting_prefix(table.id, index.id, token));

    txn.scan(&range)?
        .into_iter()
        .map(|(k, v)| {
            Ok(Posting {
                row_id: key::trailing_row_id(&k)?,
                tf: decode_tf(&k, &v)?,
            })
        })
        .collect()
}

/// Term frequency of `token` in one row, if the row contains it.
pub(crate) fn term_frequency<T: KvTxn>(
    txn: &T,
    table: &TableModel,
    index: &IndexModel,
    token: &str,
    row_id: RowId,
) -> Result<Option<u32>, InternalError> {
    let k = key::posting_key(table.id, index.id, token, row_id);

    txn.get(&k)?.map(|v| decode_tf(&k, &v)).transpose()
}

/// Token count of one indexed row, if the row is indexed.
pub(crate) fn doc_len<T: KvTxn>(
    txn: &T,
    table: &TableModel,
    index: &IndexModel,
    row_id: RowId,
) -> Result<Option<u64>, InternalError> {
    let k = key::doc_len_key(table.id, index.id, row_id);

    txn.get(&k)?
        .map(|v| key::decode_u64_value(&k, &v))
        .transpose()
}

/// Number of indexed rows and the sum of their token counts.
pub(crate) fn corpus_totals<T: KvTxn>(
    txn: &T,
    table: &TableModel,
    index: &IndexModel,
) -> Result<(u64, u64), InternalError> {
    let range = KeyRange::prefix(&key::doc_len_prefix(table.id, index.id));

    let mut docs = 0u64;
    let mut tokens = 0u64;
    for (k, v) in txn.scan(&range)? {
        docs += 1;
        tokens = tokens.saturating_add(key::decode_u64_value(&k, &v)?);
    }

    Ok((docs, tokens))
}
