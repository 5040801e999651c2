//! Whole-state export and import, plus CSV export of transactions.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use tracing::{info, warn};

use super::{AppState, Committed, StateError};
use crate::db::KeyValueStore;
use crate::models::{BudgetCap, Categories, Settings, Transaction};
use crate::validate::{self, ImportError};

/// Everything needed to rebuild a session elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExportBundle {
    pub(crate) transactions: Vec<Transaction>,
    pub(crate) settings: Settings,
    pub(crate) categories: Vec<String>,
    pub(crate) budget_cap: Decimal,
    pub(crate) export_date: String,
}

/// What an import replaced. `None`/`false` means the bundle did not carry
/// that part (or carried it with the wrong shape).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ImportSummary {
    pub(crate) transactions: Option<usize>,
    pub(crate) categories: Option<usize>,
    pub(crate) settings: bool,
    pub(crate) budget_cap: bool,
}

impl ImportSummary {
    pub(crate) fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub(crate) fn message(&self) -> String {
        if self.is_empty() {
            return "Nothing to import".to_string();
        }
        let mut parts = Vec::new();
        if let Some(n) = self.transactions {
            parts.push(format!("{n} transactions"));
        }
        if let Some(n) = self.categories {
            parts.push(format!("{n} categories"));
        }
        if self.settings {
            parts.push("settings".to_string());
        }
        if self.budget_cap {
            parts.push("budget cap".to_string());
        }
        format!("Imported {}", parts.join(", "))
    }
}

/// Parts of an import that passed their checks, ready to apply.
#[derive(Default)]
struct Incoming {
    transactions: Option<Vec<Transaction>>,
    categories: Option<Categories>,
    settings: Option<Settings>,
    budget_cap: Option<BudgetCap>,
}

fn read_bundle(value: &Value) -> Result<Incoming, ImportError> {
    let obj = value.as_object().ok_or(ImportError::NotAnObject)?;
    let mut incoming = Incoming::default();

    if let Some(raw) = obj.get("transactions").filter(|v| v.is_array()) {
        validate::validate_import(raw)?;
        let records = raw.as_array().map(Vec::as_slice).unwrap_or_default();
        let mut transactions = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let txn = Transaction::deserialize(record).map_err(|e| ImportError::Unreadable {
                position: i + 1,
                reason: e.to_string(),
            })?;
            transactions.push(txn);
        }
        incoming.transactions = Some(transactions);
    }

    if let Some(raw) = obj.get("categories").filter(|v| v.is_array()) {
        match Vec::<String>::deserialize(raw) {
            Ok(names) => incoming.categories = Some(Categories::from_names(names)),
            Err(e) => warn!(error = %e, "skipping malformed categories"),
        }
    }

    if let Some(raw) = obj.get("settings").filter(|v| v.is_object()) {
        match Settings::deserialize(raw) {
            Ok(settings) => incoming.settings = Some(settings),
            Err(e) => warn!(error = %e, "skipping malformed settings"),
        }
    }

    if let Some(raw) = obj.get("budgetCap").filter(|v| v.is_number()) {
        match validate::json_decimal(raw).and_then(BudgetCap::new) {
            Some(cap) => incoming.budget_cap = Some(cap),
            None => warn!(value = %raw, "skipping invalid budget cap"),
        }
    }

    Ok(incoming)
}

const CSV_HEADER: [&str; 7] = [
    "id",
    "date",
    "description",
    "category",
    "amount",
    "createdAt",
    "updatedAt",
];

#[derive(Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    date: &'a str,
    description: &'a str,
    category: &'a str,
    amount: String,
    created_at: &'a str,
    updated_at: &'a str,
}

impl<S: KeyValueStore> AppState<S> {
    pub(crate) fn export(&self) -> ExportBundle {
        ExportBundle {
            transactions: self.transactions.clone(),
            settings: self.settings.clone(),
            categories: self.categories.as_slice().to_vec(),
            budget_cap: self.budget_cap.amount(),
            export_date: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub(crate) fn export_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.export()).context("Failed to encode export bundle")
    }

    /// Replace whatever parts the bundle carries. Transactions are checked
    /// record by record first; a single bad record rejects the whole bundle
    /// and nothing is applied.
    pub(crate) fn import(&mut self, value: &Value) -> Result<Committed<ImportSummary>, StateError> {
        let incoming = read_bundle(value).inspect_err(|e| warn!(error = %e, "import rejected"))?;
        let mut summary = ImportSummary::default();
        let mut persisted = true;

        if let Some(transactions) = incoming.transactions {
            summary.transactions = Some(transactions.len());
            self.transactions = transactions;
            persisted &= self.storage.save_transactions(&self.transactions);
        }
        if let Some(categories) = incoming.categories {
            summary.categories = Some(categories.len());
            self.categories = categories;
            persisted &= self.storage.save_categories(&self.categories);
        }
        if let Some(settings) = incoming.settings {
            summary.settings = true;
            self.settings = settings;
            persisted &= self.storage.save_settings(&self.settings);
        }
        if let Some(cap) = incoming.budget_cap {
            summary.budget_cap = true;
            self.budget_cap = cap;
            persisted &= self.storage.save_budget_cap(cap);
        }

        info!(message = %summary.message(), "import applied");
        Ok(Committed::new(summary, persisted))
    }

    /// Write every transaction as CSV, newest first. The header row is
    /// written even when there is nothing else to write.
    pub(crate) fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        wtr.write_record(CSV_HEADER)
            .context("Failed to write CSV header")?;
        for txn in &self.transactions {
            wtr.serialize(CsvRow {
                id: &txn.id,
                date: &txn.date,
                description: &txn.description,
                category: &txn.category,
                amount: txn.amount_text(),
                created_at: &txn.created_at,
                updated_at: &txn.updated_at,
            })
            .context("Failed to write CSV row")?;
        }
        wtr.flush().context("Failed to flush CSV output")?;
        Ok(())
    }
}
