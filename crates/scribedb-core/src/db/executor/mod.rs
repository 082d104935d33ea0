mod insert;
mod plan;

#[cfg(test)]
mod tests;

pub use insert::InsertExecutor;
pub use plan::{Expr, InsertPlan};
