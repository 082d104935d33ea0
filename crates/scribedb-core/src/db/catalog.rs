use crate::{
    coerce::{SqlMode, coerce},
    error::InternalError,
    model::{IndexKind, ROW_ID_COLUMN, TableModel},
    types::TableId,
};
use parking_lot::RwLock;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

///
/// Catalog
///
/// Schema lookup collaborator. Returned models are shared snapshots and
/// stay immutable for the statement that fetched them.
///

pub trait Catalog: Send + Sync {
    fn table(&self, id: TableId) -> Result<Arc<TableModel>, InternalError>;

    fn table_by_name(&self, name: &str) -> Result<Arc<TableModel>, InternalError>;
}

///
/// MemoryCatalog
///

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    tables: RwLock<BTreeMap<TableId, Arc<TableModel>>>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a table definition.
    pub fn create_table(&self, model: TableModel) -> Result<Arc<TableModel>, InternalError> {
        validate_table(&model)?;

        let mut tables = self.tables.write();
        if tables.contains_key(&model.id) {
            return Err(InternalError::catalog_unsupported(format!(
                "table id {} already exists",
                model.id
            )));
        }
        if tables
            .values()
            .any(|t| t.name.eq_ignore_ascii_case(&model.name))
        {
            return Err(InternalError::catalog_unsupported(format!(
                "table '{}' already exists",
                model.name
            )));
        }

        let model = Arc::new(model);
        tables.insert(model.id, Arc::clone(&model));

        Ok(model)
    }
}

impl Catalog for MemoryCatalog {
    fn table(&self, id: TableId) -> Result<Arc<TableModel>, InternalError> {
        self.tables
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| InternalError::catalog_not_found(format!("unknown table id {id}")))
    }

    fn table_by_name(&self, name: &str) -> Result<Arc<TableModel>, InternalError> {
        self.tables
            .read()
            .values()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| InternalError::catalog_not_found(format!("unknown table '{name}'")))
    }
}

fn validate_table(model: &TableModel) -> Result<(), InternalError> {
    let reject = |msg: String| Err(InternalError::catalog_unsupported(msg));

    if model.columns.is_empty() {
        return reject(format!("table '{}' has no columns", model.name));
    }

    let mut names = BTreeSet::new();
    for column in &model.columns {
        let lower = column.name.to_ascii_lowercase();
        if lower == ROW_ID_COLUMN {
            return reject(format!("column name '{}' is reserved", column.name));
        }
        if !names.insert(lower) {
            return reject(format!("duplicate column '{}'", column.name));
        }
        if let Some(default) = &column.default
            && let Err(err) = coerce(column, default, SqlMode::STRICT)
        {
            return reject(format!("Invalid default value for '{}': {err}", column.name));
        }
    }

    let mut index_ids = BTreeSet::new();
    let mut index_names = BTreeSet::new();
    for index in &model.indexes {
        if !index_ids.insert(index.id) || !index_names.insert(index.name.to_ascii_lowercase()) {
            return reject(format!("duplicate index '{}'", index.name));
        }
        if index.columns.is_empty() {
            return reject(format!("index '{}' has no columns", index.name));
        }

        let mut covered = BTreeSet::new();
        for name in &index.columns {
            if !covered.insert(name.to_ascii_lowercase()) {
                return reject(format!(
                    "index '{}' names column '{name}' more than once",
                    index.name
                ));
            }
            let Some(column) = model.column(name) else {
                return reject(format!("index '{}' names unknown column '{name}'", index.name));
            };

            if index.kind == IndexKind::Inverted && !column.ty.is_text() {
                return reject(format!(
                    "inverted index '{}' requires a text column, '{name}' is {}",
                    index.name, column.ty
                ));
            }
        }

        if index.kind == IndexKind::Inverted && index.columns.len() != 1 {
            return reject(format!(
                "inverted index '{}' must cover exactly one column",
                index.name
            ));
        }
    }

    Ok(())
}

///
/// TESTS
///
