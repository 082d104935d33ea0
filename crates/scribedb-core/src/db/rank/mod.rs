//! BM25 relevance ranking over inverted-index postings.
//!
//! Statistics come from the postings visible in the caller's snapshot:
//! document count and average length from the per-row token counts,
//! document frequency from the length of each token's posting list.

mod topk;

#[cfg(test)]
mod tests;

pub use topk::{Ranked, top_k};

use crate::{
    db::{
        index::{Tokenizer, inverted},
        store::KvTxn,
    },
    error::InternalError,
    model::{IndexModel, TableModel},
    types::RowId,
};
use scribedb_config::RankingConfig;
use std::collections::{BTreeMap, BTreeSet};

///
/// Bm25Params
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
}

impl Bm25Params {
    pub const DEFAULT_K1: f64 = 1.2;
    pub const DEFAULT_B: f64 = 0.75;
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: Self::DEFAULT_K1,
            b: Self::DEFAULT_B,
        }
    }
}

impl From<&RankingConfig> for Bm25Params {
    fn from(config: &RankingConfig) -> Self {
        Self {
            k1: config.k1,
            b: config.b,
        }
    }
}

///
/// CorpusStats
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CorpusStats {
    pub doc_count: u64,
    pub avg_doc_len: f64,
    doc_freq: BTreeMap<String, u64>,
}

impl CorpusStats {
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn new(doc_count: u64, total_doc_len: u64, doc_freq: BTreeMap<String, u64>) -> Self {
        let avg_doc_len = if doc_count == 0 {
            0.0
        } else {
            total_doc_len as f64 / doc_count as f64
        };

        Self {
            doc_count,
            avg_doc_len,
            doc_freq,
        }
    }

    /// Statistics for `query_tokens` read from an inverted index.
    pub fn from_index<T: KvTxn>(
        txn: &T,
        table: &TableModel,
        index: &IndexModel,
        query_tokens: &[String],
    ) -> Result<Self, InternalError> {
        let (docs, total) = inverted::corpus_totals(txn, table, index)?;

        let mut doc_freq = BTreeMap::new();
        for token in query_tokens {
            let df = inverted::postings(txn, table, index, token)?.len() as u64;
            doc_freq.insert(token.clone(), df);
        }

        Ok(Self::new(docs, total, doc_freq))
    }

    /// Statistics computed directly from document texts.
    #[must_use]
    pub fn from_documents<'a>(
        docs: impl IntoIterator<Item = &'a str>,
        tokenizer: &Tokenizer,
        query_tokens: &[String],
    ) -> Self {
        let mut count = 0u64;
        let mut total = 0u64;
        let mut doc_freq: BTreeMap<String, u64> =
            query_tokens.iter().map(|t| (t.clone(), 0)).collect();

        for doc in docs {
            let tokens = tokenizer.tokenize(doc);
            count += 1;
            total += tokens.len() as u64;

            let distinct: BTreeSet<String> = tokens.into_iter().collect();
            for (token, df) in &mut doc_freq {
                if distinct.contains(token) {
                    *df += 1;
                }
            }
        }

        Self::new(count, total, doc_freq)
    }

    #[must_use]
    pub fn doc_freq(&self, token: &str) -> u64 {
        self.doc_freq.get(token).copied().unwrap_or(0)
    }

    /// `ln(1 + (N - df + 0.5) / (df + 0.5))`; always positive.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn idf(&self, token: &str) -> f64 {
        let n = self.doc_count as f64;
        let df = self.doc_freq(token) as f64;

        ((n - df + 0.5) / (df + 0.5)).ln_1p()
    }
}

///
/// TextRanker
///

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextRanker {
    tokenizer: Tokenizer,
    params: Bm25Params,
}

impl TextRanker {
    #[must_use]
    pub const fn new(tokenizer: Tokenizer, params: Bm25Params) -> Self {
        Self { tokenizer, params }
    }

    #[must_use]
    pub const fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Distinct query tokens in a stable order.
    #[must_use]
    pub fn query_tokens(&self, query: &str) -> Vec<String> {
        let set: BTreeSet<String> = self.tokenizer.tokenize(query).into_iter().collect();
        set.into_iter().collect()
    }

    /// BM25 score of `field` against `query`. Zero when no token matches.
    #[must_use]
    pub fn score(&self, field: &str, query: &str, stats: &CorpusStats) -> f64 {
        let freqs = self.tokenizer.term_frequencies(field);
        let doc_len: u64 = freqs.values().map(|tf| u64::from(*tf)).sum();

        self.query_tokens(query)
            .iter()
            .filter_map(|token| freqs.get(token).map(|tf| (token, *tf)))
            .map(|(token, tf)| self.term_score(tf, doc_len, stats.idf(token), stats.avg_doc_len))
            .sum()
    }

    /// Scores of every indexed row matching at least one query token.
    pub fn score_index<T: KvTxn>(
        &self,
        txn: &T,
        table: &TableModel,
        index: &IndexModel,
        query: &str,
    ) -> Result<BTreeMap<RowId, f64>, InternalError> {
        let tokens = self.query_tokens(query);
        let stats = CorpusStats::from_index(txn, table, index, &tokens)?;

        let mut scores = BTreeMap::new();
        for token in &tokens {
            let idf = stats.idf(token);
            for posting in inverted::postings(txn, table, index, token)? {
                let doc_len = inverted::doc_len(txn, table, index, posting.row_id)?.ok_or_else(|| {
                    InternalError::index_corruption(format!(
                        "posting for row {} in index '{}' has no length entry",
                        posting.row_id, index.name
                    ))
                })?;

                *scores.entry(posting.row_id).or_insert(0.0) +=
                    self.term_score(posting.tf, doc_len, idf, stats.avg_doc_len);
            }
        }

        Ok(scores)
    }

    /// Score of one row, read from its postings and length entry.
    ///
    /// Zero when the row is not indexed or shares no token with `query`.
    pub fn score_row<T: KvTxn>(
        &self,
        txn: &T,
        table: &TableModel,
        index: &IndexModel,
        row_id: RowId,
        query: &str,
    ) -> Result<f64, InternalError> {
        let Some(doc_len) = inverted::doc_len(txn, table, index, row_id)? else {
            return Ok(0.0);
        };

        let tokens = self.query_tokens(query);
        let stats = CorpusStats::from_index(txn, table, index, &tokens)?;

        let mut score = 0.0;
        for token in &tokens {
            if let Some(tf) = inverted::term_frequency(txn, table, index, token, row_id)? {
                score += self.term_score(tf, doc_len, stats.idf(token), stats.avg_doc_len);
            }
        }

        Ok(score)
    }

    #[expect(clippy::cast_precision_loss)]
    fn term_score(&self, tf: u32, doc_len: u64, idf: f64, avg_doc_len: f64) -> f64 {
        let Bm25Params { k1, b } = self.params;
        let tf = f64::from(tf);

        let denom = if avg_doc_len > 0.0 {
            k1.mul_add(b.mul_add(doc_len as f64 / avg_doc_len, 1.0 - b), tf)
        } else {
            tf + k1
        };

        idf * (tf * (k1 + 1.0)) / denom
    }
}
