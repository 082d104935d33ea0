use crate::{
    coerce::CoerceError,
    db::{allocator::AllocatorError, index::IndexError},
};
use scribedb_config::ConfigError;
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// `code()` projects it onto the user-facing error taxonomy.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    /// The variant (if present) must correspond to `origin`.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    /// Construct an InternalError with optional origin-specific detail.
    /// Store corruption gets a default store detail.
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        let message = message.into();

        let detail = matches!((class, origin), (ErrorClass::Corruption, ErrorOrigin::Store))
            .then(|| {
                ErrorDetail::Store(StoreError::Corrupt {
                    message: message.clone(),
                })
            });

        Self {
            class,
            origin,
            message,
            detail,
        }
    }

    /// Construct an executor-origin invariant violation.
    pub(crate) fn executor_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Executor,
            message.into(),
        )
    }

    /// Construct a store-origin corruption error.
    pub(crate) fn store_corruption(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Corruption, ErrorOrigin::Store, message.into())
    }

    /// Construct an index-origin corruption error.
    pub(crate) fn index_corruption(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Corruption, ErrorOrigin::Index, message.into())
    }

    /// Construct an index-origin unsupported error.
    pub(crate) fn index_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Index, message.into())
    }

    /// Construct an executor-origin unsupported error.
    pub(crate) fn executor_unsupported(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::Unsupported,
            ErrorOrigin::Executor,
            message.into(),
        )
    }

    /// Construct a catalog-origin unsupported error.
    pub(crate) fn catalog_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Catalog, message.into())
    }

    /// Construct a catalog-origin not-found error.
    pub(crate) fn catalog_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::NotFound, ErrorOrigin::Catalog, message.into())
    }

    /// Construct a transient store failure (retryable by the caller).
    pub fn store_transient(message: impl Into<String>) -> Self {
        let message = message.into();

        Self {
            class: ErrorClass::Transient,
            origin: ErrorOrigin::Store,
            message: format!("transient storage error: {message}"),
            detail: Some(ErrorDetail::Store(StoreError::Unavailable { message })),
        }
    }

    /// Construct a write-write conflict raised by the storage collaborator.
    pub fn store_conflict(key: impl Into<String>) -> Self {
        let key = key.into();

        Self {
            class: ErrorClass::Transient,
            origin: ErrorOrigin::Store,
            message: format!("transient storage error: write conflict on key {key}"),
            detail: Some(ErrorDetail::Store(StoreError::Conflict { key })),
        }
    }

    /// Prefix the message with the 1-based row ordinal of a statement row.
    #[must_use]
    pub fn with_row_context(mut self, row: usize) -> Self {
        self.message = format!("row {row}: {}", self.message);
        self
    }

    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.class, ErrorClass::Transient)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }

    /// Project this error onto the user-facing taxonomy.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match &self.detail {
            Some(ErrorDetail::Coerce(err)) => err.code(),
            Some(ErrorDetail::Index(IndexError::DuplicateKey { .. })) => ErrorCode::DuplicateKey,
            Some(ErrorDetail::Allocator(AllocatorError::Exhausted { .. })) => {
                ErrorCode::IdentifierSpaceExhausted
            }
            _ if matches!(self.class, ErrorClass::Transient) => ErrorCode::TransientStorage,
            _ => ErrorCode::Other,
        }
    }
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorClass::InvalidInput, ErrorOrigin::Config, err.to_string())
    }
}

///
/// ErrorCode
///
/// User-facing error taxonomy. Every statement failure maps to exactly one
/// code; `Other` covers internal, catalog, and corruption failures.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorCode {
    TruncatedWrongValueForField,
    DataOutOfRange,
    DataTooLong,
    TimeParseError,
    NotNullViolation,
    DuplicateKey,
    IdentifierSpaceExhausted,
    TransientStorage,
    Other,
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Store(StoreError),
    #[error("{0}")]
    Coerce(CoerceError),
    #[error("{0}")]
    Allocator(AllocatorError),
    #[error("{0}")]
    Index(IndexError),
}

///
/// StoreError
///
/// Store-specific structured error detail.
/// Never returned directly; always wrapped in [`ErrorDetail::Store`].
///

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("store corruption: {message}")]
    Corrupt { message: String },

    #[error("write conflict on key {key}")]
    Conflict { key: String },

    #[error("store unavailable: {message}")]
    Unavailable { message: String },
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    InvalidInput,
    Conflict,
    Transient,
    Exhausted,
    Corruption,
    NotFound,
    Unsupported,
    InvariantViolation,
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::InvalidInput => "invalid_input",
            Self::Conflict => "conflict",
            Self::Transient => "transient",
            Self::Exhausted => "exhausted",
            Self::Corruption => "corruption",
            Self::NotFound => "not_found",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Coerce,
    Allocator,
    Store,
    Index,
    Executor,
    Catalog,
    Config,
    Serialize,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Coerce => "coerce",
            Self::Allocator => "allocator",
            Self::Store => "store",
            Self::Index => "index",
            Self::Executor => "executor",
            Self::Catalog => "catalog",
            Self::Config => "config",
            Self::Serialize => "serialize",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_map_to_transient_code() {
        let err = InternalError::store_conflict("t1_r1");

        assert!(err.is_transient());
        assert_eq!(err.code(), ErrorCode::TransientStorage);
        assert!(err.message.contains("t1_r1"));
    }

    #[test]
    fn store_corruption_carries_default_detail() {
        let err = InternalError::store_corruption("bad row");

        assert_eq!(err.code(), ErrorCode::Other);
        assert!(matches!(
            err.detail,
            Some(ErrorDetail::Store(StoreError::Corrupt { .. }))
        ));
    }

    #[test]
    fn row_context_prefixes_message() {
        let err = InternalError::executor_invariant("boom").with_row_context(3);

        assert_eq!(err.message, "row 3: boom");
        assert_eq!(
            err.display_with_class(),
            "executor:invariant_violation: row 3: boom"
        );
    }
}
