//! Order-preserving encoding of index components.
//!
//! Every component is a one-byte tag followed by its payload. Byte order of
//! encoded tuples equals the natural order of the values: NULL first, then
//! numbers, text by bytes, and date-times chronologically. Text payloads are
//! zero-terminated with embedded zeros escaped, so an encoded component is
//! never a prefix of another and tuple order is preserved.

use crate::{
    db::store::{
        KeyRange,
        key::{self, ordered_i64_bytes},
        prefix_successor,
    },
    types::{IndexId, RowId, TableId},
    value::Value,
};
use std::ops::Bound;

const NULL_TAG: u8 = 0x00;
const INT_TAG: u8 = 0x10;
const UINT_TAG: u8 = 0x11;
const TEXT_TAG: u8 = 0x20;
const DATETIME_TAG: u8 = 0x30;

/// Append one encoded component.
pub(crate) fn encode_component(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.push(NULL_TAG),
        Value::Int(v) => {
            out.push(INT_TAG);
            out.extend_from_slice(&ordered_i64_bytes(*v));
        }
        Value::Uint(v) => {
            out.push(UINT_TAG);
            out.extend_from_slice(&v.to_be_bytes());
        }
        Value::Text(v) => {
            out.push(TEXT_TAG);
            push_terminated_bytes(out, v.as_bytes());
        }
        Value::DateTime(v) => {
            out.push(DATETIME_TAG);
            out.extend_from_slice(&ordered_i64_bytes(v.and_utc().timestamp_micros()));
        }
    }
}

#[must_use]
pub(crate) fn encode_components(values: &[Value]) -> Vec<u8> {
    let mut out = Vec::new();
    for value in values {
        encode_component(value, &mut out);
    }

    out
}

fn push_terminated_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    for &byte in bytes {
        if byte == 0 {
            out.extend_from_slice(&[0, 0xFF]);
        } else {
            out.push(byte);
        }
    }

    out.extend_from_slice(&[0, 0]);
}

///
/// EntryKey
/// Physical key of one ordered index entry.
/// The entry value is always the row id, so lookups never parse keys.
///

pub(crate) struct EntryKey {
    values_key: Vec<u8>,
    distinct: bool,
}

impl EntryKey {
    /// Unique indexes key entries by values alone, except when a component
    /// is NULL: NULLs never collide, so those entries keep the row id suffix.
    pub(crate) fn new(table: TableId, index: IndexId, values: &[Value], unique: bool) -> Self {
        let mut values_key = key::index_prefix(table, index);
        for value in values {
            encode_component(value, &mut values_key);
        }

        Self {
            values_key,
            distinct: unique && !values.iter().any(Value::is_null),
        }
    }

    /// Whether this entry must be the only one with its values.
    pub(crate) const fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// Key written for `row_id`.
    pub(crate) fn storage_key(&self, row_id: RowId) -> Vec<u8> {
        if self.distinct {
            return self.values_key.clone();
        }

        let mut out = self.values_key.clone();
        out.extend_from_slice(&ordered_i64_bytes(row_id.get()));
        out
    }
}

/// Key range covering every entry whose leading components equal `values`.
#[must_use]
pub(crate) fn equality_range(table: TableId, index: IndexId, values: &[Value]) -> KeyRange {
    let mut prefix = key::index_prefix(table, index);
    prefix.extend_from_slice(&encode_components(values));

    KeyRange::prefix(&prefix)
}

/// Key range for leading-component bounds. NULL entries are never in range.
#[must_use]
pub(crate) fn bounds_range(
    table: TableId,
    index: IndexId,
    lower: &Bound<Vec<Value>>,
    upper: &Bound<Vec<Value>>,
) -> KeyRange {
    let base = key::index_prefix(table, index);
    let with = |values: &[Value]| {
        let mut out = base.clone();
        out.extend_from_slice(&encode_components(values));
        out
    };
    let after_all = |prefix: Vec<u8>| prefix_successor(&prefix).map_or(Bound::Unbounded, Bound::Excluded);

    let start = match lower {
        Bound::Included(values) => Bound::Included(with(values)),
        Bound::Excluded(values) => match prefix_successor(&with(values)) {
            Some(next) => Bound::Included(next),
            None => Bound::Excluded(with(values)),
        },
        Bound::Unbounded => {
            let mut first_non_null = base.clone();
            first_non_null.push(NULL_TAG + 1);
            Bound::Included(first_non_null)
        }
    };

    let end = match upper {
        Bound::Included(values) => after_all(with(values)),
        Bound::Excluded(values) => Bound::Excluded(with(values)),
        Bound::Unbounded => after_all(base.clone()),
    };

    KeyRange::new(start, end)
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use proptest::prelude::*;

    fn enc(value: &Value) -> Vec<u8> {
        encode_components(std::slice::from_ref(value))
    }

    #[test]
    fn null_sorts_before_everything() {
        for v in [Value::Int(i64::MIN), Value::Text(String::new()), Value::Uint(0)] {
            assert!(enc(&Value::Null) < enc(&v));
        }
    }

    #[test]
    fn embedded_zero_bytes_keep_text_order() {
        let a = Value::Text("a".into());
        let a0 = Value::Text("a\0".into());
        let a0b = Value::Text("a\0b".into());
        let ab = Value::Text("ab".into());

        assert!(enc(&a) < enc(&a0));
        assert!(enc(&a0) < enc(&a0b));
        assert!(enc(&a0b) < enc(&ab));
    }

    #[test]
    fn tuple_order_follows_leading_component_first() {
        let a = encode_components(&[Value::Text("a".into()), Value::Int(9)]);
        let b = encode_components(&[Value::Text("ab".into()), Value::Int(1)]);
        assert!(a < b);
    }

    #[test]
    fn unique_entries_omit_the_row_id() {
        let entry = EntryKey::new(TableId::new(1), IndexId::new(1), &[Value::Int(5)], true);
        assert_eq!(entry.storage_key(RowId::new(1)), entry.storage_key(RowId::new(2)));

        let entry = EntryKey::new(TableId::new(1), IndexId::new(1), &[Value::Int(5)], false);
        assert_ne!(entry.storage_key(RowId::new(1)), entry.storage_key(RowId::new(2)));
    }

    #[test]
    fn unique_entries_with_null_keep_the_row_id() {
        let entry = EntryKey::new(TableId::new(1), IndexId::new(1), &[Value::Null], true);

        assert!(!entry.is_distinct());
        assert_ne!(entry.storage_key(RowId::new(1)), entry.storage_key(RowId::new(2)));
    }

    #[test]
    fn inclusive_range_excludes_nulls_and_outliers() {
        let (t, i) = (TableId::new(1), IndexId::new(1));
        let range = bounds_range(
            t,
            i,
            &Bound::Included(vec![Value::Int(2)]),
            &Bound::Included(vec![Value::Int(4)]),
        );
        let key = |v: Value| EntryKey::new(t, i, &[v], false).storage_key(RowId::new(7));

        assert!(!range.contains(&key(Value::Null)));
        assert!(!range.contains(&key(Value::Int(1))));
        assert!(range.contains(&key(Value::Int(2))));
        assert!(range.contains(&key(Value::Int(4))));
        assert!(!range.contains(&key(Value::Int(5))));

        let open = bounds_range(t, i, &Bound::Unbounded, &Bound::Excluded(vec![Value::Int(4)]));
        assert!(!open.contains(&key(Value::Null)));
        assert!(open.contains(&key(Value::Int(i64::MIN))));
        assert!(!open.contains(&key(Value::Int(4))));
    }

    proptest! {
        #[test]
        fn int_encoding_preserves_order(a in any::<i64>(), b in any::<i64>()) {
            prop_assert_eq!(a.cmp(&b), enc(&Value::Int(a)).cmp(&enc(&Value::Int(b))));
        }

        #[test]
        fn uint_encoding_preserves_order(a in any::<u64>(), b in any::<u64>()) {
            prop_assert_eq!(a.cmp(&b), enc(&Value::Uint(a)).cmp(&enc(&Value::Uint(b))));
        }

        #[test]
        fn text_encoding_preserves_byte_order(a in "\\PC{0,16}", b in "\\PC{0,16}") {
            let ea = enc(&Value::Text(a.clone()));
            let eb = enc(&Value::Text(b.clone()));
            prop_assert_eq!(a.as_bytes().cmp(b.as_bytes()), ea.cmp(&eb));
        }

        #[test]
        fn datetime_encoding_preserves_order(a in 0i64..4_000_000_000, b in 0i64..4_000_000_000) {
            let (Some(da), Some(db)) = (DateTime::from_timestamp(a, 0), DateTime::from_timestamp(b, 0)) else {
                return Ok(());
            };
            let ea = enc(&Value::DateTime(da.naive_utc()));
            let eb = enc(&Value::DateTime(db.naive_utc()));
            prop_assert_eq!(a.cmp(&b), ea.cmp(&eb));
        }
    }
}
