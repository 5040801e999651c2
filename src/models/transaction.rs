use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Largest amount a transaction may carry, 999,999,999,999.99.
pub(crate) const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Transaction {
    pub(crate) id: String,
    pub(crate) description: String,
    pub(crate) amount: Decimal,
    pub(crate) category: String,
    /// Format: "YYYY-MM-DD"
    pub(crate) date: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl Transaction {
    /// Build a fresh record with a generated id and both timestamps set to now.
    /// Callers are expected to have validated the fields already.
    pub(crate) fn new(description: String, amount: Decimal, category: String, date: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: new_id(),
            description,
            amount,
            category,
            date,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Amount as shown in lists and matched by search, always with two decimals.
    pub(crate) fn amount_text(&self) -> String {
        format!("{:.2}", self.amount)
    }

    /// "YYYY-MM" prefix of the date. Only meaningful once the date has been
    /// checked as a real calendar date.
    pub(crate) fn month(&self) -> Option<&str> {
        self.date.get(..7)
    }
}

fn new_id() -> String {
    format!("txn_{}", uuid::Uuid::new_v4().simple())
}

/// Raw, unvalidated field values as typed by the user.
#[derive(Debug, Clone, Default)]
pub(crate) struct TransactionInput {
    pub(crate) description: String,
    pub(crate) amount: String,
    pub(crate) category: String,
    pub(crate) date: String,
}

impl TransactionInput {
    pub(crate) fn from_transaction(txn: &Transaction) -> Self {
        Self {
            description: txn.description.clone(),
            amount: txn.amount_text(),
            category: txn.category.clone(),
            date: txn.date.clone(),
        }
    }
}
