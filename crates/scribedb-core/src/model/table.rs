use crate::{
    model::{column::ColumnModel, index::IndexModel},
    types::TableId,
};

///
/// TableModel
///
/// Schema snapshot for one table: ordered columns plus index definitions.
/// Treated as immutable for the duration of a statement.
///

#[derive(Clone, Debug, PartialEq)]
pub struct TableModel {
    pub id: TableId,
    pub name: String,
    pub columns: Vec<ColumnModel>,
    pub indexes: Vec<IndexModel>,
}

impl TableModel {
    #[must_use]
    pub fn builder(id: u32, name: impl Into<String>) -> TableModelBuilder {
        TableModelBuilder {
            model: Self {
                id: TableId::new(id),
                name: name.into(),
                columns: Vec::new(),
                indexes: Vec::new(),
            },
        }
    }

    /// Position of a column in the declared column order.
    #[must_use]
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnModel> {
        self.column_position(name).map(|pos| &self.columns[pos])
    }

    #[must_use]
    pub fn index_by_name(&self, name: &str) -> Option<&IndexModel> {
        self.indexes
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(name))
    }

    /// First ordered index whose leading column is `column`.
    #[must_use]
    pub fn ordered_index_on(&self, column: &str) -> Option<&IndexModel> {
        self.indexes
            .iter()
            .find(|i| !i.is_inverted() && i.leads_with(column))
    }

    /// Inverted index over `column`, if declared.
    #[must_use]
    pub fn inverted_index_on(&self, column: &str) -> Option<&IndexModel> {
        self.indexes
            .iter()
            .find(|i| i.is_inverted() && i.leads_with(column))
    }
}

///
/// TableModelBuilder
///

#[derive(Debug)]
pub struct TableModelBuilder {
    model: TableModel,
}

impl TableModelBuilder {
    #[must_use]
    pub fn column(mut self, column: ColumnModel) -> Self {
        self.model.columns.push(column);
        self
    }

    #[must_use]
    pub fn index(mut self, index: IndexModel) -> Self {
        self.model.indexes.push(index);
        self
    }

    #[must_use]
    pub fn build(self) -> TableModel {
        self.model
    }
}
