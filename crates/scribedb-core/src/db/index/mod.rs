//! Secondary index maintenance and lookup.
//!
//! Ordered indexes map encoded column values to row ids. Inverted indexes
//! map tokens of one text column to posting entries `(row id, tf)`, plus a
//! per-row token count used for length normalization. All entries are plain
//! key-value writes in the statement's transaction.

pub(crate) mod inverted;
mod lookup;
mod maintain;
pub(crate) mod ordered;
mod tokenizer;


pub use inverted::Posting;
pub use lookup::{MatchMode, OrderedPredicate, lookup_inverted, lookup_ordered};
pub use maintain::{IndexDelta, on_insert};
pub use tokenizer::Tokenizer;

use crate::error::{ErrorClass, ErrorDetail, ErrorOrigin, InternalError};
use thiserror::Error as ThisError;

///
/// IndexError
///

#[derive(Debug, ThisError)]
pub enum IndexError {
    #[error("Duplicate entry '{key}' for key '{index}'")]
    DuplicateKey { index: String, key: String },
}

impl From<IndexError> for InternalError {
    fn from(err: IndexError) -> Self {
        Self {
            class: ErrorClass::Conflict,
            origin: ErrorOrigin::Index,
            message: err.to_string(),
            detail: Some(ErrorDetail::Index(err)),
        }
    }
}
