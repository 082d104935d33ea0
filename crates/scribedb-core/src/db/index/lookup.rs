use crate::{
    db::{
        index::{inverted, ordered},
        store::{KvTxn, key},
    },
    error::InternalError,
    model::{IndexKind, IndexModel, TableModel},
    types::RowId,
    value::Value,
};
use std::{cmp::Ordering, ops::Bound};

///
/// OrderedPredicate
///
/// Condition over the leading columns of an ordered index. Values must
/// already be coerced to the column types.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OrderedPredicate {
    Eq(Vec<Value>),
    Range {
        lower: Bound<Vec<Value>>,
        upper: Bound<Vec<Value>>,
    },
}

impl OrderedPredicate {
    #[must_use]
    pub fn eq(value: impl Into<Value>) -> Self {
        Self::Eq(vec![value.into()])
    }

    fn arity(&self) -> usize {
        let bound_len = |b: &Bound<Vec<Value>>| match b {
            Bound::Included(v) | Bound::Excluded(v) => v.len(),
            Bound::Unbounded => 0,
        };

        match self {
            Self::Eq(values) => values.len(),
            Self::Range { lower, upper } => bound_len(lower).max(bound_len(upper)),
        }
    }
}

///
/// MatchMode
/// How a multi-token query combines posting lists.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MatchMode {
    /// Rows containing every token.
    All,
    /// Rows containing at least one token.
    #[default]
    Any,
}

/// Row ids matching `predicate`, in index order.
///
/// Comparisons with NULL never match.
pub fn lookup_ordered<T: KvTxn>(
    txn: &T,
    table: &TableModel,
    index: &IndexModel,
    predicate: &OrderedPredicate,
) -> Result<Vec<RowId>, InternalError> {
    check_index(table, index, false)?;

    let arity = predicate.arity();
    if arity > index.columns.len() {
        return Err(InternalError::index_unsupported(format!(
            "index '{}' has {} columns, predicate names {arity}",
            index.name,
            index.columns.len()
        )));
    }

    let range = match predicate {
        OrderedPredicate::Eq(values) => {
            if values.is_empty() || values.iter().any(Value::is_null) {
                return Ok(Vec::new());
            }
            ordered::equality_range(table.id, index.id, values)
        }
        OrderedPredicate::Range { lower, upper } => {
            ordered::bounds_range(table.id, index.id, lower, upper)
        }
    };

    txn.scan(&range)?
        .into_iter()
        .map(|(_, v)| key::trailing_row_id(&v))
        .collect()
}

/// Row ids whose posting lists match `tokens`, ascending.
///
/// An empty token set matches nothing.
pub fn lookup_inverted<T: KvTxn>(
    txn: &T,
    table: &TableModel,
    index: &IndexModel,
    tokens: &[String],
    mode: MatchMode,
) -> Result<Vec<RowId>, InternalError> {
    check_index(table, index, true)?;

    let mut distinct: Vec<&str> = tokens.iter().map(String::as_str).collect();
    distinct.sort_unstable();
    distinct.dedup();

    let mut acc: Option<Vec<RowId>> = None;
    for token in distinct {
        let ids: Vec<RowId> = inverted::postings(txn, table, index, token)?
            .into_iter()
            .map(|p| p.row_id)
            .collect();

        acc = Some(match (acc, mode) {
            (None, _) => ids,
            (Some(prev), MatchMode::All) => intersect_sorted(&prev, &ids),
            (Some(prev), MatchMode::Any) => union_sorted(&prev, &ids),
        });

        if mode == MatchMode::All && acc.as_ref().is_some_and(Vec::is_empty) {
            break;
        }
    }

    Ok(acc.unwrap_or_default())
}

fn check_index(table: &TableModel, index: &IndexModel, inverted: bool) -> Result<(), InternalError> {
    if !table.indexes.iter().any(|i| i.id == index.id) {
        return Err(InternalError::index_unsupported(format!(
            "index '{}' does not belong to table '{}'",
            index.name, table.name
        )));
    }

    let matches = match index.kind {
        IndexKind::Inverted => inverted,
        IndexKind::Ordered { .. } => !inverted,
    };
    if !matches {
        return Err(InternalError::index_unsupported(format!(
            "index '{}' does not support this lookup",
            index.name
        )));
    }

    Ok(())
}

pub(crate) fn intersect_sorted(a: &[RowId], b: &[RowId]) -> Vec<RowId> {
    let (mut i, mut j) = (0, 0);
    let mut out = Vec::with_capacity(a.len().min(b.len()));

    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }

    out
}

pub(crate) fn union_sorted(a: &[RowId], b: &[RowId]) -> Vec<RowId> {
    let (mut i, mut j) = (0, 0);
    let mut out = Vec::with_capacity(a.len() + b.len());

    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);

    out
}
