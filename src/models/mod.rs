mod budget;
mod category;
mod settings;
mod transaction;

pub(crate) use budget::BudgetCap;
pub(crate) use category::{Categories, DEFAULT_CATEGORIES};
pub(crate) use settings::{Currency, Settings};
pub(crate) use transaction::{Transaction, TransactionInput, MAX_AMOUNT};

#[cfg(test)]
mod tests;
