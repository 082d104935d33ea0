use crate::{
    coerce::{self, SqlMode},
    db::{
        Db,
        data::decode_row,
        executor::{Expr, InsertExecutor, InsertPlan},
        index::{self, MatchMode, OrderedPredicate},
        rank::{CorpusStats, Ranked, top_k},
        response::{InsertResult, Row},
        store::{KeyRange, KvStore, KvTxn, key},
    },
    error::InternalError,
    model::{IndexModel, ROW_ID_COLUMN, TableModel},
    obs::{LookupKind, MetricsEvent},
    types::RowId,
    value::{Literal, Value},
};
use std::{collections::BTreeMap, sync::Arc};

///
/// DbSession
///
/// Per-connection handle: a shared `Db` plus the session's SQL mode.
/// Every read opens its own snapshot; every INSERT is its own transaction.
///

pub struct DbSession<S: KvStore> {
    db: Db<S>,
    mode: SqlMode,
}

impl<S: KvStore> DbSession<S> {
    #[must_use]
    pub fn new(db: Db<S>) -> Self {
        Self {
            db,
            mode: SqlMode::default(),
        }
    }

    #[must_use]
    pub const fn with_mode(mut self, mode: SqlMode) -> Self {
        self.mode = mode;
        self
    }

    pub const fn set_strict(&mut self, strict: bool) {
        self.mode.strict = strict;
    }

    #[must_use]
    pub const fn mode(&self) -> SqlMode {
        self.mode
    }

    #[must_use]
    pub const fn db(&self) -> &Db<S> {
        &self.db
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    pub fn execute_insert(&self, plan: &InsertPlan) -> Result<InsertResult, InternalError> {
        InsertExecutor::new(&self.db, self.mode).execute(plan)
    }

    /// Insert literal rows into the named table.
    /// An empty column list targets every declared column.
    pub fn insert(
        &self,
        table: &str,
        columns: &[&str],
        rows: Vec<Vec<Literal>>,
    ) -> Result<InsertResult, InternalError> {
        let model = self.table(table)?;

        let mut plan = InsertPlan::new(model.id);
        if !columns.is_empty() {
            plan = plan.columns(columns);
        }
        plan.rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Expr::Literal).collect())
            .collect();

        self.execute_insert(&plan)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn table(&self, name: &str) -> Result<Arc<TableModel>, InternalError> {
        self.db.catalog().table_by_name(name)
    }

    pub fn get_row(&self, table: &str, row_id: RowId) -> Result<Option<Row>, InternalError> {
        let model = self.table(table)?;
        let txn = self.db.store().begin()?;
        let row = read_row(&txn, &model, row_id);
        txn.abort();

        row
    }

    /// Every row, ascending by row id.
    pub fn scan_rows(&self, table: &str) -> Result<Vec<Row>, InternalError> {
        let model = self.table(table)?;
        let txn = self.db.store().begin()?;
        let rows = scan_all(&txn, &model);
        txn.abort();

        let rows = rows?;
        self.record_lookup(LookupKind::FullScan, rows.len());

        Ok(rows)
    }

    pub fn count_rows(&self, table: &str) -> Result<usize, InternalError> {
        self.scan_rows(table).map(|rows| rows.len())
    }

    /// Row ids where `column = literal`, ascending.
    ///
    /// Uses an ordered index led by `column` when one exists. A literal that
    /// does not coerce exactly to the column type matches nothing.
    pub fn row_ids_where_eq(
        &self,
        table: &str,
        column: &str,
        literal: &Literal,
    ) -> Result<Vec<RowId>, InternalError> {
        let model = self.table(table)?;

        if column.eq_ignore_ascii_case(ROW_ID_COLUMN) {
            let Some(id) = literal_row_id(literal) else {
                return Ok(Vec::new());
            };
            return Ok(self
                .get_row(table, id)?
                .map(|r| vec![r.row_id])
                .unwrap_or_default());
        }

        let col = model.column(column).ok_or_else(|| unknown_column(&model, column))?;
        if literal.is_null() {
            return Ok(Vec::new());
        }
        let value = match coerce::coerce(col, literal, SqlMode::LENIENT) {
            Ok(coerced) if coerced.warning.is_none() => coerced.value,
            _ => return Ok(Vec::new()),
        };

        let txn = self.db.store().begin()?;
        let ids = match model.ordered_index_on(column) {
            Some(idx) => {
                let mut ids =
                    index::lookup_ordered(&txn, &model, idx, &OrderedPredicate::Eq(vec![value]));
                if let Ok(ids) = &mut ids {
                    ids.sort_unstable();
                    self.record_lookup(LookupKind::Ordered, ids.len());
                }
                ids
            }
            None => {
                let pos = model.column_position(column).unwrap_or_default();
                scan_all(&txn, &model).map(|rows| {
                    self.record_lookup(LookupKind::FullScan, rows.len());
                    rows.into_iter()
                        .filter(|r| r.values.get(pos) == Some(&value))
                        .map(|r| r.row_id)
                        .collect()
                })
            }
        };
        txn.abort();

        ids
    }

    /// Rows whose text `column` is byte-equal to `text`.
    ///
    /// With an inverted index the candidates are rows containing every
    /// token of `text`; each candidate is then compared exactly.
    pub fn rows_where_text_eq(
        &self,
        table: &str,
        column: &str,
        text: &str,
    ) -> Result<Vec<Row>, InternalError> {
        let model = self.table(table)?;
        let pos = model
            .column_position(column)
            .ok_or_else(|| unknown_column(&model, column))?;

        let txn = self.db.store().begin()?;
        let rows = self.text_eq_rows(&txn, &model, pos, text);
        txn.abort();

        rows
    }

    /// Rows whose text `column` equals any of `texts`, ascending by row id.
    pub fn rows_where_text_in(
        &self,
        table: &str,
        column: &str,
        texts: &[&str],
    ) -> Result<Vec<Row>, InternalError> {
        let model = self.table(table)?;
        let pos = model
            .column_position(column)
            .ok_or_else(|| unknown_column(&model, column))?;

        let txn = self.db.store().begin()?;
        let mut merged = BTreeMap::new();
        let mut outcome = Ok(());
        for text in texts {
            match self.text_eq_rows(&txn, &model, pos, text) {
                Ok(rows) => merged.extend(rows.into_iter().map(|r| (r.row_id, r))),
                Err(err) => {
                    outcome = Err(err);
                    break;
                }
            }
        }
        txn.abort();

        outcome.map(|()| merged.into_values().collect())
    }

    /// Cut-word match: rows whose tokenized `column` shares at least one
    /// token with the tokenized `query`.
    pub fn search_text(
        &self,
        table: &str,
        column: &str,
        query: &str,
    ) -> Result<Vec<Row>, InternalError> {
        let model = self.table(table)?;
        let pos = model
            .column_position(column)
            .ok_or_else(|| unknown_column(&model, column))?;
        let tokens = self.db.tokenizer().tokenize(query);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let txn = self.db.store().begin()?;
        let rows = match model.inverted_index_on(column) {
            Some(idx) => self.inverted_rows(&txn, &model, idx, &tokens, MatchMode::Any),
            None => scan_all(&txn, &model).map(|rows| {
                self.record_lookup(LookupKind::FullScan, rows.len());
                let wanted: Vec<&String> = tokens.iter().collect();
                rows.into_iter()
                    .filter(|r| {
                        r.values
                            .get(pos)
                            .and_then(Value::searchable_text)
                            .is_some_and(|text| {
                                self.db
                                    .tokenizer()
                                    .tokenize(&text)
                                    .iter()
                                    .any(|t| wanted.contains(&t))
                            })
                    })
                    .collect()
            }),
        };
        txn.abort();

        rows
    }

    /// Lookup over a named ordered index.
    pub fn lookup_ordered(
        &self,
        table: &str,
        index_name: &str,
        predicate: &OrderedPredicate,
    ) -> Result<Vec<RowId>, InternalError> {
        let model = self.table(table)?;
        let idx = find_index(&model, index_name)?;

        let txn = self.db.store().begin()?;
        let ids = index::lookup_ordered(&txn, &model, idx, predicate);
        txn.abort();

        if let Ok(ids) = &ids {
            self.record_lookup(LookupKind::Ordered, ids.len());
        }
        ids
    }

    /// Lookup over a named inverted index with pre-tokenized input.
    pub fn lookup_inverted(
        &self,
        table: &str,
        index_name: &str,
        tokens: &[String],
        mode: MatchMode,
    ) -> Result<Vec<RowId>, InternalError> {
        let model = self.table(table)?;
        let idx = find_index(&model, index_name)?;

        let txn = self.db.store().begin()?;
        let ids = index::lookup_inverted(&txn, &model, idx, tokens, mode);
        txn.abort();

        if let Ok(ids) = &ids {
            self.record_lookup(LookupKind::Inverted, ids.len());
        }
        ids
    }

    // ------------------------------------------------------------------
    // Ranking
    // ------------------------------------------------------------------

    /// BM25 score of one stored row's `column` against `query`.
    pub fn score(
        &self,
        table: &str,
        column: &str,
        row_id: RowId,
        query: &str,
    ) -> Result<f64, InternalError> {
        let model = self.table(table)?;
        let pos = model
            .column_position(column)
            .ok_or_else(|| unknown_column(&model, column))?;

        let txn = self.db.store().begin()?;
        let score = match model.inverted_index_on(column) {
            Some(idx) => self
                .db
                .ranker()
                .score_row(&txn, &model, idx, row_id, query),
            // Unindexed columns need whole-table statistics.
            None => self
                .scores(&txn, &model, column, pos, query)
                .map(|scores| scores.get(&row_id).copied().unwrap_or(0.0)),
        };
        txn.abort();

        score
    }

    /// `ORDER BY score(column, query) DESC LIMIT k`, ties by ascending row id.
    ///
    /// `candidates` restricts the ranked rows (an upstream filter); without
    /// it every row of the table is ranked, non-matching rows scoring 0.
    pub fn rank_top_k(
        &self,
        table: &str,
        column: &str,
        query: &str,
        k: usize,
        candidates: Option<&[RowId]>,
    ) -> Result<Vec<Ranked>, InternalError> {
        let model = self.table(table)?;
        let pos = model
            .column_position(column)
            .ok_or_else(|| unknown_column(&model, column))?;

        let txn = self.db.store().begin()?;
        let ranked = self.scores(&txn, &model, column, pos, query).and_then(|scores| {
            let universe: Vec<RowId> = match candidates {
                Some(ids) => ids.to_vec(),
                None => scan_row_ids(&txn, &model)?,
            };

            Ok(top_k(
                universe.into_iter().map(|row_id| Ranked {
                    row_id,
                    score: scores.get(&row_id).copied().unwrap_or(0.0),
                }),
                k,
            ))
        });
        txn.abort();

        if let Ok(ranked) = &ranked {
            self.db.sink().record(MetricsEvent::Rank {
                candidates: ranked.len() as u64,
            });
        }
        ranked
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    // Scores of rows matching at least one query token.
    fn scores(
        &self,
        txn: &S::Txn,
        model: &TableModel,
        column: &str,
        pos: usize,
        query: &str,
    ) -> Result<BTreeMap<RowId, f64>, InternalError> {
        let ranker = self.db.ranker();

        if let Some(idx) = model.inverted_index_on(column) {
            return ranker.score_index(txn, model, idx, query);
        }

        let docs: Vec<(RowId, String)> = scan_all(txn, model)?
            .into_iter()
            .filter_map(|r| {
                let text = r.values.get(pos).and_then(Value::searchable_text)?;
                Some((r.row_id, text))
            })
            .collect();
        let tokens = ranker.query_tokens(query);
        let stats = CorpusStats::from_documents(
            docs.iter().map(|(_, text)| text.as_str()),
            ranker.tokenizer(),
            &tokens,
        );

        Ok(docs
            .iter()
            .map(|(id, text)| (*id, ranker.score(text, query, &stats)))
            .filter(|(_, score)| *score > 0.0)
            .collect())
    }

    fn text_eq_rows(
        &self,
        txn: &S::Txn,
        model: &TableModel,
        pos: usize,
        text: &str,
    ) -> Result<Vec<Row>, InternalError> {
        let column = &model.columns[pos].name;
        let tokens = self.db.tokenizer().tokenize(text);

        let candidates = match model.inverted_index_on(column) {
            Some(idx) if !tokens.is_empty() => {
                self.inverted_rows(txn, model, idx, &tokens, MatchMode::All)?
            }
            _ => {
                let rows = scan_all(txn, model)?;
                self.record_lookup(LookupKind::FullScan, rows.len());
                rows
            }
        };

        Ok(candidates
            .into_iter()
            .filter(|r| r.values.get(pos).and_then(Value::as_text) == Some(text))
            .collect())
    }

    fn inverted_rows(
        &self,
        txn: &S::Txn,
        model: &TableModel,
        idx: &IndexModel,
        tokens: &[String],
        mode: MatchMode,
    ) -> Result<Vec<Row>, InternalError> {
        let ids = index::lookup_inverted(txn, model, idx, tokens, mode)?;
        self.record_lookup(LookupKind::Inverted, ids.len());

        let mut rows = Vec::with_capacity(ids.len());
        for id in ids {
            let row = read_row(txn, model, id)?.ok_or_else(|| {
                InternalError::index_corruption(format!(
                    "index '{}' references missing row {id}",
                    idx.name
                ))
            })?;
            rows.push(row);
        }

        Ok(rows)
    }

    fn record_lookup(&self, kind: LookupKind, rows: usize) {
        self.db.sink().record(MetricsEvent::Lookup {
            kind,
            rows: rows as u64,
        });
    }
}

fn read_row<T: KvTxn>(
    txn: &T,
    model: &TableModel,
    row_id: RowId,
) -> Result<Option<Row>, InternalError> {
    txn.get(&key::row_key(model.id, row_id))?
        .map(|bytes| {
            Ok(Row {
                row_id,
                values: decode_row(&bytes, model.columns.len())?,
            })
        })
        .transpose()
}

fn scan_all<T: KvTxn>(txn: &T, model: &TableModel) -> Result<Vec<Row>, InternalError> {
    let range = KeyRange::prefix(&key::row_prefix(model.id));

    txn.scan(&range)?
        .into_iter()
        .map(|(k, v)| {
            Ok(Row {
                row_id: key::trailing_row_id(&k)?,
                values: decode_row(&v, model.columns.len())?,
            })
        })
        .collect()
}

fn scan_row_ids<T: KvTxn>(txn: &T, model: &TableModel) -> Result<Vec<RowId>, InternalError> {
    let range = KeyRange::prefix(&key::row_prefix(model.id));

    txn.scan(&range)?
        .into_iter()
        .map(|(k, _)| key::trailing_row_id(&k))
        .collect()
}

fn literal_row_id(literal: &Literal) -> Option<RowId> {
    let id = match literal {
        Literal::Int(v) => *v,
        Literal::Uint(v) => i64::try_from(*v).ok()?,
        Literal::Str(s) => s.trim().parse().ok()?,
        Literal::Null | Literal::Float(_) => return None,
    };

    (id >= RowId::MIN.get()).then_some(RowId::new(id))
}

fn find_index<'a>(model: &'a TableModel, name: &str) -> Result<&'a IndexModel, InternalError> {
    model.index_by_name(name).ok_or_else(|| {
        InternalError::catalog_not_found(format!(
            "unknown index '{name}' on table '{}'",
            model.name
        ))
    })
}

fn unknown_column(model: &TableModel, column: &str) -> InternalError {
    InternalError::catalog_not_found(format!(
        "Unknown column '{column}' in table '{}'",
        model.name
    ))
}
