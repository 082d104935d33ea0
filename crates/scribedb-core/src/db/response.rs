use crate::{
    coerce::Warning,
    model::TableModel,
    types::RowId,
    value::Value,
};

///
/// Row
/// One stored row read back with its identifier.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Row {
    pub row_id: RowId,
    /// Values in declared column order.
    pub values: Vec<Value>,
}

impl Row {
    /// Value of `column`; `_rowid` resolves to the row identifier.
    #[must_use]
    pub fn get(&self, table: &TableModel, column: &str) -> Option<Value> {
        if column.eq_ignore_ascii_case(crate::model::ROW_ID_COLUMN) {
            return Some(Value::Int(self.row_id.get()));
        }

        table
            .column_position(column)
            .and_then(|pos| self.values.get(pos))
            .cloned()
    }
}

///
/// RowWarning
/// A coercion warning attributed to its 1-based statement row.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RowWarning {
    pub row: usize,
    pub warning: Warning,
}

///
/// InsertResult
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InsertResult {
    pub rows_affected: u64,
    /// First id handed out by the allocator, if any row took an implicit id.
    pub first_insert_id: Option<RowId>,
    /// Id of the last row written, in source order.
    pub last_insert_id: Option<RowId>,
    pub warnings: Vec<RowWarning>,
}
