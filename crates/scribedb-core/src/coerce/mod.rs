//! Type coercion engine.
//!
//! Converts grammar-level literals into stored `Value`s for one declared
//! column type. Coercion is pure: identical `(column, literal, mode)` inputs
//! always produce the identical value or the identical error kind.
//!
//! Strict mode rejects lossy conversions. Non-strict mode performs the lossy
//! conversion and reports a `Warning` alongside the value. Malformed
//! date-time input and NULL into a NOT NULL column fail in both modes.

mod int;
mod text;
mod time;


pub use time::parse_datetime;

use crate::{
    error::{ErrorClass, ErrorCode, ErrorDetail, ErrorOrigin, InternalError},
    model::{ColumnModel, ColumnType},
    value::{Literal, Value},
};
use thiserror::Error as ThisError;

///
/// SqlMode
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SqlMode {
    pub strict: bool,
}

impl SqlMode {
    pub const STRICT: Self = Self { strict: true };
    pub const LENIENT: Self = Self { strict: false };
}

impl Default for SqlMode {
    fn default() -> Self {
        Self::STRICT
    }
}

///
/// Warning
/// Lossy conversion accepted under non-strict mode.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Warning {
    pub column: String,
    pub message: String,
}

impl Warning {
    fn new(column: &str, message: impl Into<String>) -> Self {
        Self {
            column: column.to_string(),
            message: message.into(),
        }
    }
}

///
/// Coerced
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Coerced {
    pub value: Value,
    pub warning: Option<Warning>,
}

impl Coerced {
    const fn exact(value: Value) -> Self {
        Self {
            value,
            warning: None,
        }
    }

    const fn lossy(value: Value, warning: Warning) -> Self {
        Self {
            value,
            warning: Some(warning),
        }
    }
}

///
/// CoerceError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum CoerceError {
    #[error("Incorrect {ty} value: '{value}' for column '{column}'")]
    TruncatedWrongValueForField {
        column: String,
        ty: String,
        value: String,
    },

    #[error("Out of range value for column '{column}': {value}")]
    DataOutOfRange { column: String, value: String },

    #[error("Data too long for column '{column}': {len} exceeds {max}")]
    DataTooLong {
        column: String,
        len: usize,
        max: usize,
    },

    #[error("Incorrect {ty} value: '{value}' for column '{column}' ({reason})")]
    TimeParse {
        column: String,
        ty: String,
        value: String,
        reason: &'static str,
    },

    #[error("Column '{column}' cannot be null")]
    NotNull { column: String },
}

impl CoerceError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::TruncatedWrongValueForField { .. } => ErrorCode::TruncatedWrongValueForField,
            Self::DataOutOfRange { .. } => ErrorCode::DataOutOfRange,
            Self::DataTooLong { .. } => ErrorCode::DataTooLong,
            Self::TimeParse { .. } => ErrorCode::TimeParseError,
            Self::NotNull { .. } => ErrorCode::NotNullViolation,
        }
    }
}

impl From<CoerceError> for InternalError {
    fn from(err: CoerceError) -> Self {
        Self {
            class: ErrorClass::InvalidInput,
            origin: ErrorOrigin::Coerce,
            message: err.to_string(),
            detail: Some(ErrorDetail::Coerce(err)),
        }
    }
}

/// Coerce one literal into the stored representation of `column`.
pub fn coerce(
    column: &ColumnModel,
    input: &Literal,
    mode: SqlMode,
) -> Result<Coerced, CoerceError> {
    if input.is_null() {
        return if column.nullable {
            Ok(Coerced::exact(Value::Null))
        } else {
            Err(CoerceError::NotNull {
                column: column.name.clone(),
            })
        };
    }

    match column.ty {
        ColumnType::Int { width, unsigned } => {
            int::coerce_int(&column.name, column.ty, width, unsigned, input, mode)
        }
        ColumnType::Char(max) | ColumnType::VarChar(max) => {
            text::coerce_chars(&column.name, max as usize, input, mode)
        }
        ColumnType::Text => {
            text::coerce_bytes(&column.name, ColumnType::TEXT_MAX_BYTES, input, mode)
        }
        ColumnType::LongText => Ok(Coerced::exact(Value::Text(text::literal_text(input)))),
        ColumnType::Timestamp | ColumnType::DateTime => {
            time::coerce_datetime(&column.name, column.ty, input)
        }
    }
}
