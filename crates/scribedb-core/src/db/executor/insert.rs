use crate::{
    coerce::{self, SqlMode},
    db::{
        Db,
        allocator::IdRange,
        data::encode_row,
        executor::plan::{Expr, InsertPlan},
        index::{self, IndexDelta, IndexError},
        response::{InsertResult, RowWarning},
        store::{KvStore, KvTxn, key},
    },
    error::InternalError,
    model::{ColumnModel, ColumnType, ROW_ID_COLUMN, TableModel},
    obs::{MetricsEvent, StatementOutcome},
    types::RowId,
    value::{Literal, Value},
};
use tracing::{debug, warn};

///
/// Target
/// Where one position of the statement's column list lands.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Target {
    Column(usize),
    RowId,
}

///
/// InsertExecutor
///
/// Runs one bound INSERT as a single transaction: allocate ids once,
/// coerce rows in source order, write each row and its index entries,
/// then commit. The first error aborts everything.
///

pub struct InsertExecutor<'a, S: KvStore> {
    db: &'a Db<S>,
    mode: SqlMode,
}

impl<'a, S: KvStore> InsertExecutor<'a, S> {
    #[must_use]
    pub const fn new(db: &'a Db<S>, mode: SqlMode) -> Self {
        Self { db, mode }
    }

    pub fn execute(&self, plan: &InsertPlan) -> Result<InsertResult, InternalError> {
        let table = self.db.catalog().table(plan.table)?;
        let sink = self.db.sink();
        sink.record(MetricsEvent::InsertStart { table: table.id });

        match self.run(&table, plan) {
            Ok((result, delta)) => {
                sink.record(MetricsEvent::IndexDelta {
                    table: table.id,
                    ordered: delta.ordered,
                    postings: delta.postings,
                });
                sink.record(MetricsEvent::InsertFinish {
                    table: table.id,
                    outcome: StatementOutcome::Committed,
                    rows: result.rows_affected,
                    warnings: result.warnings.len() as u64,
                });
                debug!(
                    table_id = table.id.get(),
                    rows = result.rows_affected,
                    last_insert_id = result.last_insert_id.map(RowId::get),
                    warnings = result.warnings.len(),
                    "insert committed"
                );

                Ok(result)
            }
            Err(err) => {
                sink.record(MetricsEvent::InsertFinish {
                    table: table.id,
                    outcome: StatementOutcome::Aborted,
                    rows: 0,
                    warnings: 0,
                });
                warn!(
                    table_id = table.id.get(),
                    class = %err.class,
                    origin = %err.origin,
                    error = %err.message,
                    "insert aborted"
                );

                Err(err)
            }
        }
    }

    fn run(
        &self,
        table: &TableModel,
        plan: &InsertPlan,
    ) -> Result<(InsertResult, IndexDelta), InternalError> {
        let targets = resolve_targets(table, plan)?;
        let explicit = explicit_row_ids(&targets, plan)?;

        let implicit = explicit.iter().filter(|id| id.is_none()).count() as u64;
        let supplied: Vec<RowId> = explicit.iter().flatten().copied().collect();
        if !supplied.is_empty() {
            self.db.allocator().rebase_all(table.id, &supplied)?;
        }

        let mut txn = self.db.store().begin()?;
        let range = if implicit > 0 {
            match self.db.allocator().allocate(table.id, implicit) {
                Ok(range) => Some(range),
                Err(err) => {
                    txn.abort();
                    return Err(err);
                }
            }
        } else {
            None
        };

        match self.write_rows(&mut txn, table, plan, &targets, &explicit, range) {
            Ok((result, delta)) => {
                txn.commit()?;
                Ok((result, delta))
            }
            Err(err) => {
                txn.abort();
                Err(err)
            }
        }
    }

    fn write_rows(
        &self,
        txn: &mut S::Txn,
        table: &TableModel,
        plan: &InsertPlan,
        targets: &[Target],
        explicit: &[Option<RowId>],
        range: Option<IdRange>,
    ) -> Result<(InsertResult, IndexDelta), InternalError> {
        let mut implicit_ids = range.into_iter().flat_map(IdRange::ids);
        let mut result = InsertResult {
            first_insert_id: range.map(|r| r.first),
            ..InsertResult::default()
        };
        let mut delta = IndexDelta::default();

        for (pos, (exprs, explicit_id)) in plan.rows.iter().zip(explicit).enumerate() {
            let row_no = pos + 1;

            let row_id = match explicit_id {
                Some(id) => *id,
                None => implicit_ids.next().ok_or_else(|| {
                    InternalError::executor_invariant("allocated range shorter than implicit rows")
                })?,
            };

            let values = self
                .coerce_row(table, targets, exprs, row_no, &mut result.warnings)
                .map_err(|err| err.with_row_context(row_no))?;

            self.write_row(txn, table, row_id, &values, &mut delta)
                .map_err(|err| err.with_row_context(row_no))?;

            result.rows_affected += 1;
            result.last_insert_id = Some(row_id);
        }

        Ok((result, delta))
    }

    fn coerce_row(
        &self,
        table: &TableModel,
        targets: &[Target],
        exprs: &[Expr],
        row_no: usize,
        warnings: &mut Vec<RowWarning>,
    ) -> Result<Vec<Value>, InternalError> {
        let mut provided: Vec<Option<&Expr>> = vec![None; table.columns.len()];
        for (target, expr) in targets.iter().zip(exprs) {
            if let Target::Column(pos) = target {
                provided[*pos] = Some(expr);
            }
        }

        let mut values = Vec::with_capacity(table.columns.len());
        for (column, expr) in table.columns.iter().zip(provided) {
            let literal = match expr {
                Some(Expr::Literal(lit)) => lit,
                Some(Expr::Default) | None => default_literal(column),
            };

            let coerced = coerce::coerce(column, literal, self.mode)?;
            if let Some(warning) = coerced.warning {
                warnings.push(RowWarning {
                    row: row_no,
                    warning,
                });
            }
            values.push(coerced.value);
        }

        Ok(values)
    }

    fn write_row(
        &self,
        txn: &mut S::Txn,
        table: &TableModel,
        row_id: RowId,
        values: &[Value],
        delta: &mut IndexDelta,
    ) -> Result<(), InternalError> {
        let row_key = key::row_key(table.id, row_id);
        if txn.get(&row_key)?.is_some() {
            self.db
                .sink()
                .record(MetricsEvent::UniqueViolation { table: table.id });

            return Err(IndexError::DuplicateKey {
                index: "PRIMARY".to_string(),
                key: row_id.to_string(),
            }
            .into());
        }

        let raw = encode_row(values)?;
        txn.put(row_key, raw.into_bytes())?;

        let written = index::on_insert(
            txn,
            table,
            row_id,
            values,
            self.db.tokenizer(),
            self.db.sink(),
        )?;
        delta.merge(written);

        Ok(())
    }
}

static NULL_LITERAL: Literal = Literal::Null;

fn default_literal(column: &ColumnModel) -> &Literal {
    column.default.as_ref().unwrap_or(&NULL_LITERAL)
}

fn resolve_targets(table: &TableModel, plan: &InsertPlan) -> Result<Vec<Target>, InternalError> {
    let targets: Vec<Target> = match &plan.columns {
        None => (0..table.columns.len()).map(Target::Column).collect(),
        Some(names) => {
            let mut out = Vec::with_capacity(names.len());
            for name in names {
                let target = if name.eq_ignore_ascii_case(ROW_ID_COLUMN) {
                    Target::RowId
                } else {
                    table.column_position(name).map(Target::Column).ok_or_else(|| {
                        InternalError::catalog_not_found(format!(
                            "Unknown column '{name}' in table '{}'",
                            table.name
                        ))
                    })?
                };

                if out.contains(&target) {
                    return Err(InternalError::executor_unsupported(format!(
                        "Column '{name}' specified twice"
                    )));
                }
                out.push(target);
            }
            out
        }
    };

    for (pos, exprs) in plan.rows.iter().enumerate() {
        if exprs.len() != targets.len() {
            return Err(InternalError::executor_unsupported(format!(
                "Column count doesn't match value count: expected {}, found {}",
                targets.len(),
                exprs.len()
            ))
            .with_row_context(pos + 1));
        }
    }

    Ok(targets)
}

// Explicit `_rowid` values, one slot per row; `None` takes an allocated id.
fn explicit_row_ids(
    targets: &[Target],
    plan: &InsertPlan,
) -> Result<Vec<Option<RowId>>, InternalError> {
    let Some(slot) = targets.iter().position(|t| *t == Target::RowId) else {
        return Ok(vec![None; plan.rows.len()]);
    };

    let column = ColumnModel::new(ROW_ID_COLUMN, ColumnType::bigint());

    plan.rows
        .iter()
        .enumerate()
        .map(|(pos, exprs)| {
            let literal = match &exprs[slot] {
                Expr::Default | Expr::Literal(Literal::Null) => return Ok(None),
                Expr::Literal(lit) => lit,
            };

            let id = coerce::coerce(&column, literal, SqlMode::STRICT)
                .map_err(InternalError::from)
                .and_then(|c| match c.value {
                    Value::Int(id) if id >= RowId::MIN.get() => Ok(RowId::new(id)),
                    other => Err(InternalError::from(coerce::CoerceError::DataOutOfRange {
                        column: ROW_ID_COLUMN.to_string(),
                        value: other.to_string(),
                    })),
                })
                .map_err(|err| err.with_row_context(pos + 1))?;

            Ok(Some(id))
        })
        .collect()
}
