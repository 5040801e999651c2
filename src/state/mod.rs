//! Session state: the transaction collection plus categories, settings and
//! the budget cap. Every mutation is validated, applied in memory and then
//! written through to the store.

mod bundle;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{KeyValueStore, Storage};
use crate::models::{BudgetCap, Categories, Currency, Settings, Transaction, TransactionInput};
use crate::search::View;
use crate::stats::{self, BudgetStatus, Stats};
use crate::validate::{self, FieldErrors, ImportError, ValidationError};

pub(crate) use bundle::{ExportBundle, ImportSummary};

#[derive(Debug, Error)]
pub(crate) enum StateError {
    #[error(transparent)]
    Invalid(#[from] FieldErrors),
    #[error("Unknown category \"{0}\"")]
    UnknownCategory(String),
    #[error("Category \"{0}\" already exists")]
    DuplicateCategory(String),
    #[error(transparent)]
    CategoryName(ValidationError),
    #[error("No transaction with id {0}")]
    NotFound(String),
    #[error("Budget cap must be between 0 and 999,999,999,999.99")]
    InvalidCap,
    #[error("Conversion rate must be a positive number")]
    InvalidRate,
    #[error(transparent)]
    Import(#[from] ImportError),
}

/// Result of a mutation that went through. `persisted` is false when the
/// write-through failed; the in-memory change is kept either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Committed<T> {
    pub(crate) value: T,
    pub(crate) persisted: bool,
}

impl<T> Committed<T> {
    fn new(value: T, persisted: bool) -> Self {
        if !persisted {
            warn!("change kept in memory only; write to store failed");
        }
        Self { value, persisted }
    }
}

/// State over whichever store the process managed to open.
pub(crate) type Session = AppState<Box<dyn KeyValueStore>>;

pub(crate) struct AppState<S> {
    storage: Storage<S>,
    transactions: Vec<Transaction>,
    categories: Categories,
    settings: Settings,
    budget_cap: BudgetCap,
}

impl<S: KeyValueStore> AppState<S> {
    pub(crate) fn load(storage: Storage<S>) -> Self {
        let transactions = storage.load_transactions();
        let categories = storage.load_categories();
        let settings = storage.load_settings();
        let budget_cap = storage.load_budget_cap();
        info!(
            transactions = transactions.len(),
            categories = categories.len(),
            "loaded state"
        );
        Self {
            storage,
            transactions,
            categories,
            settings,
            budget_cap,
        }
    }

    // ── Reads ────────────────────────────────────────────────

    /// Newest entry first.
    pub(crate) fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub(crate) fn categories(&self) -> &Categories {
        &self.categories
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.settings
    }

    pub(crate) fn budget_cap(&self) -> BudgetCap {
        self.budget_cap
    }

    pub(crate) fn find(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    pub(crate) fn view(&self, view: &View) -> Vec<&Transaction> {
        view.apply(&self.transactions)
    }

    pub(crate) fn stats(&self, today: NaiveDate) -> Stats {
        stats::calculate_stats(&self.transactions, today)
    }

    pub(crate) fn budget_status(&self, today: NaiveDate) -> Option<BudgetStatus> {
        stats::budget_status(self.stats(today).total_expenses, self.budget_cap)
    }

    #[cfg(test)]
    pub(crate) fn storage(&self) -> &Storage<S> {
        &self.storage
    }

    // ── Transactions ─────────────────────────────────────────

    fn parse_input(input: &TransactionInput) -> Result<Decimal, StateError> {
        validate::validate_transaction(input)?;
        // The amount grammar guarantees this parses.
        Decimal::from_str(&input.amount).map_err(|_| {
            let mut errors = FieldErrors::default();
            errors
                .0
                .insert(validate::Field::Amount, ValidationError::AmountFormat);
            StateError::Invalid(errors)
        })
    }

    pub(crate) fn add_transaction(
        &mut self,
        input: &TransactionInput,
    ) -> Result<Committed<Transaction>, StateError> {
        let amount = Self::parse_input(input)?;
        if !self.categories.contains(&input.category) {
            return Err(StateError::UnknownCategory(input.category.clone()));
        }
        let txn = Transaction::new(
            input.description.clone(),
            amount,
            input.category.clone(),
            input.date.clone(),
        );
        self.transactions.insert(0, txn.clone());
        info!(id = %txn.id, amount = %txn.amount, category = %txn.category, "added transaction");
        let persisted = self.storage.save_transactions(&self.transactions);
        Ok(Committed::new(txn, persisted))
    }

    /// Replace the editable fields of a record. A category that no longer
    /// exists may be kept as is, but cannot be newly assigned.
    pub(crate) fn update_transaction(
        &mut self,
        id: &str,
        input: &TransactionInput,
    ) -> Result<Committed<Transaction>, StateError> {
        let amount = Self::parse_input(input)?;
        let idx = self
            .transactions
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| StateError::NotFound(id.to_string()))?;

        let category_changed = self.transactions[idx].category != input.category;
        if category_changed && !self.categories.contains(&input.category) {
            return Err(StateError::UnknownCategory(input.category.clone()));
        }

        let txn = &mut self.transactions[idx];
        txn.description = input.description.clone();
        txn.amount = amount;
        txn.category = input.category.clone();
        txn.date = input.date.clone();
        txn.updated_at = chrono::Utc::now().to_rfc3339();
        let updated = txn.clone();

        info!(id, "updated transaction");
        let persisted = self.storage.save_transactions(&self.transactions);
        Ok(Committed::new(updated, persisted))
    }

    pub(crate) fn delete_transaction(
        &mut self,
        id: &str,
    ) -> Result<Committed<Transaction>, StateError> {
        let idx = self
            .transactions
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| StateError::NotFound(id.to_string()))?;
        let removed = self.transactions.remove(idx);
        info!(id, "deleted transaction");
        let persisted = self.storage.save_transactions(&self.transactions);
        Ok(Committed::new(removed, persisted))
    }

    // ── Categories ───────────────────────────────────────────

    pub(crate) fn add_category(&mut self, name: &str) -> Result<Committed<()>, StateError> {
        validate::validate_category(name).map_err(StateError::CategoryName)?;
        if !self.categories.insert(name.to_string()) {
            return Err(StateError::DuplicateCategory(name.to_string()));
        }
        info!(name, "added category");
        let persisted = self.storage.save_categories(&self.categories);
        Ok(Committed::new((), persisted))
    }

    /// Remove a category. Transactions that use it keep the name; the count
    /// of such records is returned.
    pub(crate) fn delete_category(&mut self, name: &str) -> Result<Committed<usize>, StateError> {
        if !self.categories.remove(name) {
            return Err(StateError::UnknownCategory(name.to_string()));
        }
        let orphaned = self
            .transactions
            .iter()
            .filter(|t| t.category == name)
            .count();
        info!(name, orphaned, "deleted category");
        let persisted = self.storage.save_categories(&self.categories);
        Ok(Committed::new(orphaned, persisted))
    }

    // ── Settings and budget ──────────────────────────────────

    pub(crate) fn set_base_currency(&mut self, currency: Currency) -> Committed<()> {
        self.settings.base_currency = currency;
        info!(%currency, "base currency changed");
        let persisted = self.storage.save_settings(&self.settings);
        Committed::new((), persisted)
    }

    pub(crate) fn set_rate(
        &mut self,
        currency: Currency,
        rate: Decimal,
    ) -> Result<Committed<()>, StateError> {
        if !self.settings.set_rate(currency, rate) {
            return Err(StateError::InvalidRate);
        }
        info!(%currency, %rate, "conversion rate changed");
        let persisted = self.storage.save_settings(&self.settings);
        Ok(Committed::new((), persisted))
    }

    /// Zero clears the cap.
    pub(crate) fn set_budget_cap(&mut self, amount: Decimal) -> Result<Committed<()>, StateError> {
        let cap = BudgetCap::new(amount).ok_or(StateError::InvalidCap)?;
        self.budget_cap = cap;
        info!(cap = %amount, "budget cap changed");
        let persisted = self.storage.save_budget_cap(cap);
        Ok(Committed::new((), persisted))
    }

    /// Drop everything, in memory and in the store.
    pub(crate) fn clear_all(&mut self) -> Committed<()> {
        self.transactions.clear();
        self.categories = Categories::defaults();
        self.settings = Settings::default();
        self.budget_cap = BudgetCap::UNSET;
        info!("cleared all data");
        let persisted = self.storage.clear_all();
        Committed::new((), persisted)
    }
}

#[cfg(test)]
mod tests;
