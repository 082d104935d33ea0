//! Physical key layout.
//!
//! ```text
//! t{table}_r{rowid}                 row payload
//! t{table}_i{index}{values}[rowid]  ordered index entry (rowid omitted when unique)
//! t{table}_x{index}{token}{rowid}   posting, value = term frequency
//! t{table}_l{index}{rowid}          document length, value = token count
//! m_w{table}                        allocator watermark
//! ```
//!
//! Table and index ids are fixed-width big-endian; row ids use the
//! sign-flipped big-endian form so byte order equals numeric order.

use crate::{
    error::InternalError,
    types::{IndexId, RowId, TableId},
};
use std::fmt::Write as _;

const TABLE_TAG: u8 = b't';
const ROW_TAG: &[u8; 2] = b"_r";
const INDEX_TAG: &[u8; 2] = b"_i";
const POSTING_TAG: &[u8; 2] = b"_x";
const DOC_LEN_TAG: &[u8; 2] = b"_l";
const WATERMARK_TAG: &[u8; 3] = b"m_w";

pub(crate) const ROW_ID_BYTES: usize = 8;

#[must_use]
pub(crate) const fn ordered_i64_bytes(value: i64) -> [u8; 8] {
    let biased = value.cast_unsigned() ^ (1u64 << 63);
    biased.to_be_bytes()
}

#[must_use]
pub(crate) const fn ordered_i64_from_bytes(bytes: [u8; 8]) -> i64 {
    (u64::from_be_bytes(bytes) ^ (1u64 << 63)).cast_signed()
}

fn table_prefix(table: TableId, tag: &[u8; 2]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + 4 + 2 + 4 + ROW_ID_BYTES);
    out.push(TABLE_TAG);
    out.extend_from_slice(&table.get().to_be_bytes());
    out.extend_from_slice(tag);
    out
}

fn index_scoped(table: TableId, tag: &[u8; 2], index: IndexId) -> Vec<u8> {
    let mut out = table_prefix(table, tag);
    out.extend_from_slice(&index.get().to_be_bytes());
    out
}

// ------------------------------------------------------------------
// Rows
// ------------------------------------------------------------------

#[must_use]
pub(crate) fn row_prefix(table: TableId) -> Vec<u8> {
    table_prefix(table, ROW_TAG)
}

#[must_use]
pub(crate) fn row_key(table: TableId, row_id: RowId) -> Vec<u8> {
    let mut out = row_prefix(table);
    out.extend_from_slice(&ordered_i64_bytes(row_id.get()));
    out
}

// ------------------------------------------------------------------
// Ordered index
// ------------------------------------------------------------------

#[must_use]
pub(crate) fn index_prefix(table: TableId, index: IndexId) -> Vec<u8> {
    index_scoped(table, INDEX_TAG, index)
}

// ------------------------------------------------------------------
// Inverted index
// ------------------------------------------------------------------

#[must_use]
pub(crate) fn posting_prefix(table: TableId, index: IndexId, token: &str) -> Vec<u8> {
    let mut out = index_scoped(table, POSTING_TAG, index);
    // Tokens never contain NUL, so a single terminator keeps prefixes disjoint.
    out.extend_from_slice(token.as_bytes());
    out.push(0);
    out
}

#[must_use]
pub(crate) fn posting_key(table: TableId, index: IndexId, token: &str, row_id: RowId) -> Vec<u8> {
    let mut out = posting_prefix(table, index, token);
    out.extend_from_slice(&ordered_i64_bytes(row_id.get()));
    out
}

#[must_use]
pub(crate) fn doc_len_prefix(table: TableId, index: IndexId) -> Vec<u8> {
    index_scoped(table, DOC_LEN_TAG, index)
}

#[must_use]
pub(crate) fn doc_len_key(table: TableId, index: IndexId, row_id: RowId) -> Vec<u8> {
    let mut out = doc_len_prefix(table, index);
    out.extend_from_slice(&ordered_i64_bytes(row_id.get()));
    out
}

// ------------------------------------------------------------------
// Allocator
// ------------------------------------------------------------------

#[must_use]
pub(crate) fn watermark_key(table: TableId) -> Vec<u8> {
    let mut out = WATERMARK_TAG.to_vec();
    out.extend_from_slice(&table.get().to_be_bytes());
    out
}

// ------------------------------------------------------------------
// Decoding
// ------------------------------------------------------------------

/// Read the row id stored in the trailing bytes of a row, posting,
/// document-length, or non-unique index key.
pub(crate) fn trailing_row_id(key: &[u8]) -> Result<RowId, InternalError> {
    let split = key.len().checked_sub(ROW_ID_BYTES).ok_or_else(|| {
        InternalError::store_corruption(format!("key too short for row id: {}", render(key)))
    })?;

    let mut bytes = [0u8; ROW_ID_BYTES];
    bytes.copy_from_slice(&key[split..]);
    let id = ordered_i64_from_bytes(bytes);

    if id < RowId::MIN.get() {
        return Err(InternalError::store_corruption(format!(
            "row id {id} out of range in key {}",
            render(key)
        )));
    }

    Ok(RowId::new(id))
}

pub(crate) fn decode_u64_value(key: &[u8], value: &[u8]) -> Result<u64, InternalError> {
    let bytes: [u8; 8] = value.try_into().map_err(|_| {
        InternalError::store_corruption(format!(
            "expected 8-byte counter under {}, found {} bytes",
            render(key),
            value.len()
        ))
    })?;

    Ok(u64::from_be_bytes(bytes))
}

/// Printable form of a key for diagnostics; non-graphic bytes are hex-escaped.
#[must_use]
pub(crate) fn render(key: &[u8]) -> String {
    let mut out = String::with_capacity(key.len() * 2);
    for &b in key {
        if b.is_ascii_graphic() {
            out.push(char::from(b));
        } else {
            let _ = write!(out, "\\x{b:02x}");
        }
    }

    out
}

///
/// TESTS
///
