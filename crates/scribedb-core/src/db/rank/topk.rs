use crate::types::RowId;
use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
};

///
/// Ranked
///
/// One scored row. Greater means better: higher score, then lower row id.
///

#[derive(Clone, Copy, Debug)]
pub struct Ranked {
    pub row_id: RowId,
    pub score: f64,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.row_id.cmp(&self.row_id))
    }
}

/// The `k` best rows, best first: descending score, ties by ascending row id.
#[must_use]
pub fn top_k(rows: impl IntoIterator<Item = Ranked>, k: usize) -> Vec<Ranked> {
    if k == 0 {
        return Vec::new();
    }

    let mut heap = BinaryHeap::with_capacity(k + 1);
    for row in rows {
        heap.push(Reverse(row));
        if heap.len() > k {
            heap.pop();
        }
    }

    let mut out: Vec<Ranked> = heap.into_iter().map(|Reverse(r)| r).collect();
    out.sort_unstable_by(|a, b| b.cmp(a));

    out
}
