use crate::{
    db::data::MAX_ROW_BYTES,
    error::InternalError,
    serialize::{deserialize, serialize},
    value::Value,
};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// RawRowError
///

#[derive(Debug, ThisError)]
pub(crate) enum RawRowError {
    #[error("row exceeds max size: {len} bytes (limit {MAX_ROW_BYTES})")]
    TooLarge { len: usize },
}

impl From<RawRowError> for InternalError {
    fn from(err: RawRowError) -> Self {
        Self::executor_unsupported(err.to_string())
    }
}

///
/// RawRow
/// Serialized row bytes, bounded by construction.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct RawRow(Vec<u8>);

impl RawRow {
    pub(crate) fn try_new(bytes: Vec<u8>) -> Result<Self, RawRowError> {
        if bytes.len() > MAX_ROW_BYTES {
            return Err(RawRowError::TooLarge { len: bytes.len() });
        }

        Ok(Self(bytes))
    }

    #[must_use]
    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

///
/// StoredValue
///
/// On-disk form of a column value. Date-times are kept as microseconds
/// since the epoch so the payload stays independent of chrono's serde.
///

#[derive(Debug, Deserialize, Serialize)]
enum StoredValue {
    Null,
    Int(i64),
    Uint(u64),
    Text(String),
    DateTime(i64),
}

impl From<&Value> for StoredValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Int(v) => Self::Int(*v),
            Value::Uint(v) => Self::Uint(*v),
            Value::Text(v) => Self::Text(v.clone()),
            Value::DateTime(v) => Self::DateTime(v.and_utc().timestamp_micros()),
        }
    }
}

impl TryFrom<StoredValue> for Value {
    type Error = InternalError;

    fn try_from(stored: StoredValue) -> Result<Self, Self::Error> {
        Ok(match stored {
            StoredValue::Null => Self::Null,
            StoredValue::Int(v) => Self::Int(v),
            StoredValue::Uint(v) => Self::Uint(v),
            StoredValue::Text(v) => Self::Text(v),
            StoredValue::DateTime(micros) => {
                let dt = DateTime::from_timestamp_micros(micros).ok_or_else(|| {
                    InternalError::store_corruption(format!(
                        "stored date-time out of range: {micros}"
                    ))
                })?;
                Self::DateTime(dt.naive_utc())
            }
        })
    }
}

/// Encode one row's values (in column order) into a bounded payload.
pub(crate) fn encode_row(values: &[Value]) -> Result<RawRow, InternalError> {
    let stored: Vec<StoredValue> = values.iter().map(StoredValue::from).collect();
    let bytes = serialize(&stored)?;

    Ok(RawRow::try_new(bytes)?)
}

/// Decode a payload written by [`encode_row`], checking its arity.
pub(crate) fn decode_row(bytes: &[u8], arity: usize) -> Result<Vec<Value>, InternalError> {
    let stored: Vec<StoredValue> = deserialize(bytes)?;
    if stored.len() != arity {
        return Err(InternalError::store_corruption(format!(
            "row arity mismatch: expected {arity} values, found {}",
            stored.len()
        )));
    }

    stored.into_iter().map(Value::try_from).collect()
}

///
/// TESTS
///
