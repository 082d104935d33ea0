//! Runtime schema descriptors handed to the core by the catalog.

pub mod column;
pub mod index;
pub mod table;

pub use column::{ColumnModel, ColumnType, IntWidth};
pub use index::{IndexKind, IndexModel};
pub use table::{TableModel, TableModelBuilder};

/// Hidden column exposing the row identifier. It is never declared in a
/// table's schema but may be named in an INSERT column list.
pub const ROW_ID_COLUMN: &str = "_rowid";
