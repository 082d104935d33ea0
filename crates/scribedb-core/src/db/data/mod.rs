//! Row payload storage.

mod row;

pub(crate) use row::{RawRow, decode_row, encode_row};

/// Max serialized bytes for a single row.
pub(crate) const MAX_ROW_BYTES: usize = 64 * 1024 * 1024;
