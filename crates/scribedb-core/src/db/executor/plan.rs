use crate::{types::TableId, value::Literal};

///
/// Expr
/// Row value expression of a bound INSERT.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// `DEFAULT`: the column's declared default, else NULL.
    Default,
}

impl From<Literal> for Expr {
    fn from(value: Literal) -> Self {
        Self::Literal(value)
    }
}

macro_rules! impl_expr_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Expr {
                fn from(value: $ty) -> Self {
                    Self::Literal(Literal::from(value))
                }
            }
        )*
    };
}

impl_expr_from!(i32, i64, u64, f64, &str, String);

///
/// InsertPlan
///
/// Bound INSERT: target table, column list, and row expressions already
/// checked by the grammar but not yet coerced.
///

#[derive(Clone, Debug, PartialEq)]
pub struct InsertPlan {
    pub table: TableId,
    /// Target columns; `None` means every declared column in order.
    pub columns: Option<Vec<String>>,
    pub rows: Vec<Vec<Expr>>,
}

impl InsertPlan {
    #[must_use]
    pub const fn new(table: TableId) -> Self {
        Self {
            table,
            columns: None,
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(ToString::to_string).collect());
        self
    }

    #[must_use]
    pub fn row<I, E>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        self.rows.push(values.into_iter().map(Into::into).collect());
        self
    }
}
