use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, warn};

use super::KeyValueStore;
use crate::models::{BudgetCap, Categories, Settings, Transaction};

pub(crate) mod keys {
    pub(crate) const TRANSACTIONS: &str = "finance:transactions";
    pub(crate) const CATEGORIES: &str = "finance:categories";
    pub(crate) const SETTINGS: &str = "finance:settings";
    pub(crate) const BUDGET_CAP: &str = "finance:budget_cap";

    pub(crate) const ALL: &[&str] = &[TRANSACTIONS, CATEGORIES, SETTINGS, BUDGET_CAP];
}

/// Typed persistence over a key-value store. Reads never fail: missing or
/// unreadable values come back as defaults. Writes report success as a flag
/// so callers can keep working in memory when the store is unavailable.
pub(crate) struct Storage<S> {
    store: S,
}

impl<S: KeyValueStore> Storage<S> {
    pub(crate) fn new(store: S) -> Self {
        Self { store }
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    #[cfg(test)]
    pub(crate) fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "failed to read stored value");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "ignoring corrupt stored value");
                None
            }
        }
    }

    fn save<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> bool {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                error!(key, error = %e, "failed to encode value");
                return false;
            }
        };
        match self.store.set(key, &json) {
            Ok(()) => true,
            Err(e) => {
                error!(key, error = %e, "failed to write value");
                false
            }
        }
    }

    pub(crate) fn load_transactions(&self) -> Vec<Transaction> {
        self.load(keys::TRANSACTIONS).unwrap_or_default()
    }

    pub(crate) fn save_transactions(&mut self, transactions: &[Transaction]) -> bool {
        self.save(keys::TRANSACTIONS, transactions)
    }

    pub(crate) fn load_categories(&self) -> Categories {
        self.load::<Vec<String>>(keys::CATEGORIES)
            .map(Categories::from_names)
            .unwrap_or_else(Categories::defaults)
    }

    pub(crate) fn save_categories(&mut self, categories: &Categories) -> bool {
        self.save(keys::CATEGORIES, categories.as_slice())
    }

    pub(crate) fn load_settings(&self) -> Settings {
        self.load(keys::SETTINGS).unwrap_or_default()
    }

    pub(crate) fn save_settings(&mut self, settings: &Settings) -> bool {
        self.save(keys::SETTINGS, settings)
    }

    pub(crate) fn load_budget_cap(&self) -> BudgetCap {
        self.load::<Decimal>(keys::BUDGET_CAP)
            .and_then(BudgetCap::new)
            .unwrap_or_default()
    }

    pub(crate) fn save_budget_cap(&mut self, cap: BudgetCap) -> bool {
        self.save(keys::BUDGET_CAP, &cap.amount())
    }

    /// Remove every key this application owns.
    pub(crate) fn clear_all(&mut self) -> bool {
        let mut ok = true;
        for key in keys::ALL {
            if let Err(e) = self.store.remove(key) {
                error!(key, error = %e, "failed to remove value");
                ok = false;
            }
        }
        ok
    }
}
