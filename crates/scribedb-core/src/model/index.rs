use crate::types::IndexId;
use std::fmt::{self, Display};

///
/// IndexKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IndexKind {
    /// Order-preserving key over one or more columns.
    Ordered { unique: bool },
    /// Token -> posting list over one text column.
    Inverted,
}

///
/// IndexModel
/// Runtime-only descriptor for an index used by the maintainer and lookups.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IndexModel {
    pub id: IndexId,
    pub name: String,
    /// Indexed column names; order is significant for ordered indexes.
    pub columns: Vec<String>,
    pub kind: IndexKind,
}

impl IndexModel {
    #[must_use]
    pub fn ordered(id: u32, name: impl Into<String>, columns: &[&str], unique: bool) -> Self {
        Self {
            id: IndexId::new(id),
            name: name.into(),
            columns: columns.iter().map(ToString::to_string).collect(),
            kind: IndexKind::Ordered { unique },
        }
    }

    #[must_use]
    pub fn inverted(id: u32, name: impl Into<String>, column: &str) -> Self {
        Self {
            id: IndexId::new(id),
            name: name.into(),
            columns: vec![column.to_string()],
            kind: IndexKind::Inverted,
        }
    }

    #[must_use]
    pub const fn is_inverted(&self) -> bool {
        matches!(self.kind, IndexKind::Inverted)
    }

    /// Whether this index's leading column is `column`.
    #[must_use]
    pub fn leads_with(&self, column: &str) -> bool {
        self.columns
            .first()
            .is_some_and(|c| c.eq_ignore_ascii_case(column))
    }
}

impl Display for IndexModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns = self.columns.join(", ");

        match self.kind {
            IndexKind::Ordered { unique: true } => write!(f, "UNIQUE {}({columns})", self.name),
            IndexKind::Ordered { unique: false } => write!(f, "{}({columns})", self.name),
            IndexKind::Inverted => write!(f, "{}({columns}) USING INVERTED", self.name),
        }
    }
}
