#![allow(clippy::unwrap_used)]

use super::*;
use crate::db::{keys, Database, MemoryStore};
use crate::search::{Query, SortKey};
use crate::stats::BudgetLevel;
use rust_decimal_macros::dec;
use serde_json::json;

fn fresh() -> AppState<MemoryStore> {
    AppState::load(Storage::new(MemoryStore::default()))
}

fn input(description: &str, amount: &str, category: &str, date: &str) -> TransactionInput {
    TransactionInput {
        description: description.into(),
        amount: amount.into(),
        category: category.into(),
        date: date.into(),
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
}

struct FailingWrites;

impl KeyValueStore for FailingWrites {
    fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    fn set(&mut self, _key: &str, _value: &str) -> anyhow::Result<()> {
        anyhow::bail!("disk full")
    }

    fn remove(&mut self, _key: &str) -> anyhow::Result<()> {
        anyhow::bail!("disk full")
    }
}

// ── Loading ───────────────────────────────────────────────────

#[test]
fn test_load_defaults() {
    let state = fresh();
    assert!(state.transactions().is_empty());
    assert_eq!(state.categories(), &Categories::defaults());
    assert_eq!(state.settings(), &Settings::default());
    assert!(!state.budget_cap().is_set());
}

#[test]
fn test_load_reads_saved_values() {
    let mut storage = Storage::new(MemoryStore::default());
    let txn = Transaction::new("Tea".into(), dec!(3), "Food".into(), "2024-03-01".into());
    storage.save_transactions(std::slice::from_ref(&txn));
    storage.save_budget_cap(BudgetCap::new(dec!(200)).unwrap());

    let state = AppState::load(storage);
    assert_eq!(state.transactions(), &[txn]);
    assert_eq!(state.budget_cap().amount(), dec!(200));
}

// ── Transactions ──────────────────────────────────────────────

#[test]
fn test_add_prepends_and_persists() {
    let mut state = fresh();
    let first = state
        .add_transaction(&input("Lunch", "12.50", "Food", "2024-03-01"))
        .unwrap();
    assert!(first.persisted);
    let second = state
        .add_transaction(&input("Novel", "20", "Books", "2024-03-02"))
        .unwrap();

    let ids: Vec<&str> = state.transactions().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec![second.value.id.as_str(), first.value.id.as_str()]);
    assert_eq!(first.value.amount, dec!(12.50));
    assert_eq!(state.storage().load_transactions(), state.transactions());
}

#[test]
fn test_add_reports_every_bad_field() {
    let mut state = fresh();
    let err = state
        .add_transaction(&input(" x", "1.234", "F00d", "2025-02-29"))
        .unwrap_err();
    match err {
        StateError::Invalid(errors) => assert_eq!(errors.len(), 4),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(state.transactions().is_empty());
}

#[test]
fn test_large_amounts_survive_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fintrack.db");
    let mut state = AppState::load(Storage::new(Database::open(&path).unwrap()));
    for amount in ["999999999999.99", "12345678901.23", "0.01"] {
        let done = state
            .add_transaction(&input("Savings", amount, "Food", "2024-03-01"))
            .unwrap();
        assert!(done.persisted);
    }
    let saved = state.transactions().to_vec();
    drop(state);

    let reloaded = AppState::load(Storage::new(Database::open(&path).unwrap()));
    assert_eq!(reloaded.transactions(), saved.as_slice());
    let amounts: Vec<Decimal> = reloaded.transactions().iter().map(|t| t.amount).collect();
    assert_eq!(
        amounts,
        vec![dec!(0.01), dec!(12345678901.23), dec!(999999999999.99)]
    );
    assert_eq!(
        reloaded.stats(today()).total_expenses,
        dec!(1012345678901.23)
    );
}

#[test]
fn test_add_refuses_amount_above_limit() {
    let mut state = fresh();
    state
        .add_transaction(&input("Keep me", "5", "Food", "2024-03-01"))
        .unwrap();
    let too_large = [
        "1000000000000",
        "12345678901234567.89",
        "123456789012345678901234567890",
    ];
    for big in too_large {
        let err = state
            .add_transaction(&input("Yacht", big, "Food", "2024-03-01"))
            .unwrap_err();
        match err {
            StateError::Invalid(errors) => assert_eq!(
                errors.get(validate::Field::Amount),
                Some(&ValidationError::AmountTooLarge)
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(state.transactions().len(), 1);
    assert_eq!(state.storage().load_transactions().len(), 1);
}

#[test]
fn test_add_requires_known_category() {
    let mut state = fresh();
    let err = state
        .add_transaction(&input("Rent", "900", "Housing", "2024-03-01"))
        .unwrap_err();
    assert!(matches!(err, StateError::UnknownCategory(ref c) if c == "Housing"));
}

#[test]
fn test_update_keeps_identity() {
    let mut state = fresh();
    let added = state
        .add_transaction(&input("Lunch", "12.50", "Food", "2024-03-01"))
        .unwrap()
        .value;

    let updated = state
        .update_transaction(&added.id, &input("Big lunch", "15", "Food", "2024-03-02"))
        .unwrap()
        .value;
    assert_eq!(updated.id, added.id);
    assert_eq!(updated.created_at, added.created_at);
    assert_eq!(updated.description, "Big lunch");
    assert_eq!(updated.amount, dec!(15));
    assert_eq!(state.find(&added.id), Some(&updated));
}

#[test]
fn test_update_allows_orphaned_category_to_stay() {
    let mut state = fresh();
    state.add_category("Travel").unwrap();
    let id = state
        .add_transaction(&input("Train", "40", "Travel", "2024-03-01"))
        .unwrap()
        .value
        .id;
    state.delete_category("Travel").unwrap();

    // Same category, other fields edited
    assert!(state
        .update_transaction(&id, &input("Train home", "40", "Travel", "2024-03-01"))
        .is_ok());
    // Moving another record into the deleted category is refused
    let other = state
        .add_transaction(&input("Bus", "2", "Transport", "2024-03-01"))
        .unwrap()
        .value
        .id;
    assert!(matches!(
        state.update_transaction(&other, &input("Bus", "2", "Travel", "2024-03-01")),
        Err(StateError::UnknownCategory(_))
    ));
}

#[test]
fn test_update_and_delete_unknown_id() {
    let mut state = fresh();
    assert!(matches!(
        state.update_transaction("nope", &input("Tea", "1", "Food", "2024-03-01")),
        Err(StateError::NotFound(_))
    ));
    assert!(matches!(
        state.delete_transaction("nope"),
        Err(StateError::NotFound(_))
    ));
}

#[test]
fn test_delete_transaction() {
    let mut state = fresh();
    let id = state
        .add_transaction(&input("Tea", "1", "Food", "2024-03-01"))
        .unwrap()
        .value
        .id;
    let removed = state.delete_transaction(&id).unwrap();
    assert_eq!(removed.value.id, id);
    assert!(state.transactions().is_empty());
    assert!(state.storage().load_transactions().is_empty());
}

// ── Categories ────────────────────────────────────────────────

#[test]
fn test_add_category() {
    let mut state = fresh();
    state.add_category("Home Office").unwrap();
    assert!(state.categories().contains("Home Office"));
    assert!(state.storage().load_categories().contains("Home Office"));

    assert!(matches!(
        state.add_category("Food"),
        Err(StateError::DuplicateCategory(_))
    ));
    assert!(matches!(
        state.add_category("Bad--Name"),
        Err(StateError::CategoryName(ValidationError::CategoryFormat))
    ));
}

#[test]
fn test_delete_category_counts_orphans() {
    let mut state = fresh();
    state
        .add_transaction(&input("Lunch", "10", "Food", "2024-03-01"))
        .unwrap();
    state
        .add_transaction(&input("Dinner", "20", "Food", "2024-03-02"))
        .unwrap();

    let orphaned = state.delete_category("Food").unwrap().value;
    assert_eq!(orphaned, 2);
    assert!(!state.categories().contains("Food"));
    // Records keep their label
    assert!(state.transactions().iter().all(|t| t.category == "Food"));

    assert!(matches!(
        state.delete_category("Food"),
        Err(StateError::UnknownCategory(_))
    ));
}

// ── Settings and budget ───────────────────────────────────────

#[test]
fn test_currency_and_rate() {
    let mut state = fresh();
    state.set_base_currency(Currency::Eur);
    state.set_rate(Currency::Gbp, dec!(0.86)).unwrap();
    assert!(matches!(
        state.set_rate(Currency::Gbp, dec!(0)),
        Err(StateError::InvalidRate)
    ));

    let stored = state.storage().load_settings();
    assert_eq!(stored.base_currency, Currency::Eur);
    assert_eq!(stored.rates.get("GBP"), Some(&dec!(0.86)));
}

#[test]
fn test_budget_status_uses_total_expenses() {
    let mut state = fresh();
    assert!(state.budget_status(today()).is_none());

    state.set_budget_cap(dec!(100)).unwrap();
    state
        .add_transaction(&input("Groceries", "85", "Food", "2024-03-01"))
        .unwrap();
    let status = state.budget_status(today()).unwrap();
    assert_eq!(status.level, BudgetLevel::Warning);
    assert_eq!(status.remaining, dec!(15));

    assert!(matches!(
        state.set_budget_cap(dec!(-1)),
        Err(StateError::InvalidCap)
    ));
    // Zero clears the cap
    state.set_budget_cap(dec!(0)).unwrap();
    assert!(state.budget_status(today()).is_none());
}

#[test]
fn test_stats_and_view() {
    let mut state = fresh();
    state
        .add_transaction(&input("Coffee beans", "30", "Food", "2024-03-09"))
        .unwrap();
    state
        .add_transaction(&input("Atlas", "10", "Books", "2024-03-10"))
        .unwrap();

    let stats = state.stats(today());
    assert_eq!(stats.total, 2);
    assert_eq!(stats.total_expenses, dec!(40));
    assert_eq!(stats.top_category, "Food");

    let view = View {
        query: Query::compile("coffee", false),
        category: None,
        sort: SortKey::DateDesc,
    };
    let shown = state.view(&view);
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].description, "Coffee beans");
}

#[test]
fn test_clear_all() {
    let mut state = fresh();
    state
        .add_transaction(&input("Tea", "1", "Food", "2024-03-01"))
        .unwrap();
    state.add_category("Garden").unwrap();
    state.set_budget_cap(dec!(50)).unwrap();

    assert!(state.clear_all().persisted);
    assert!(state.transactions().is_empty());
    assert_eq!(state.categories(), &Categories::defaults());
    assert!(!state.budget_cap().is_set());
    for key in keys::ALL {
        assert!(state.storage().store().get(key).unwrap().is_none());
    }
}

// ── Write failures ────────────────────────────────────────────

#[test]
fn test_failed_write_keeps_memory_change() {
    let mut state = AppState::load(Storage::new(FailingWrites));
    let added = state
        .add_transaction(&input("Tea", "1", "Food", "2024-03-01"))
        .unwrap();
    assert!(!added.persisted);
    assert_eq!(state.transactions().len(), 1);

    let cap = state.set_budget_cap(dec!(10)).unwrap();
    assert!(!cap.persisted);
    assert_eq!(state.budget_cap().amount(), dec!(10));
}

// ── Export / import ───────────────────────────────────────────

#[test]
fn test_export_shape() {
    let mut state = fresh();
    state
        .add_transaction(&input("Tea", "1.50", "Food", "2024-03-01"))
        .unwrap();
    state.set_budget_cap(dec!(300)).unwrap();

    let value: serde_json::Value = serde_json::from_str(&state.export_json().unwrap()).unwrap();
    assert_eq!(value["transactions"][0]["amount"], 1.5);
    assert_eq!(value["settings"]["baseCurrency"], "USD");
    assert_eq!(value["categories"][0], "Food");
    assert_eq!(value["budgetCap"], 300.0);
    assert!(value["exportDate"].is_string());
}

#[test]
fn test_export_clear_import_roundtrip() {
    let mut state = fresh();
    state
        .add_transaction(&input("Lunch", "12.50", "Food", "2024-03-01"))
        .unwrap();
    state
        .add_transaction(&input("Novel", "20.99", "Books", "2024-02-11"))
        .unwrap();
    state.add_category("Garden").unwrap();
    state.set_base_currency(Currency::Gbp);
    state.set_budget_cap(dec!(450.75)).unwrap();

    let before = state.export();
    let json = serde_json::to_value(&before).unwrap();
    state.clear_all();

    let summary = state.import(&json).unwrap();
    assert!(summary.persisted);
    assert_eq!(summary.value.transactions, Some(2));
    assert_eq!(state.transactions(), before.transactions.as_slice());
    assert_eq!(state.categories().as_slice(), before.categories.as_slice());
    assert_eq!(state.settings(), &before.settings);
    assert_eq!(state.budget_cap().amount(), dec!(450.75));
    // And it was written through
    assert_eq!(state.storage().load_transactions(), before.transactions);
}

#[test]
fn test_import_keeps_exact_amounts() {
    let mut state = fresh();
    let bundle: serde_json::Value = serde_json::from_str(
        r#"{
            "transactions": [
                {"id": "a", "description": "Deposit", "amount": 999999999999.99,
                 "category": "Food", "date": "2024-01-01",
                 "createdAt": "x", "updatedAt": "x"}
            ],
            "budgetCap": 123456789012.34
        }"#,
    )
    .unwrap();
    state.import(&bundle).unwrap();
    assert_eq!(state.transactions()[0].amount, dec!(999999999999.99));
    assert_eq!(state.budget_cap().amount(), dec!(123456789012.34));

    let too_big: serde_json::Value =
        serde_json::from_str(r#"{"budgetCap": 1000000000000}"#).unwrap();
    let summary = state.import(&too_big).unwrap().value;
    assert!(!summary.budget_cap);
    assert_eq!(state.budget_cap().amount(), dec!(123456789012.34));
}

#[test]
fn test_import_rejects_whole_bundle() {
    let mut state = fresh();
    state
        .add_transaction(&input("Keep me", "5", "Food", "2024-03-01"))
        .unwrap();

    let bundle = json!({
        "transactions": [
            {"id": "a", "description": "Ok", "amount": 1, "category": "Food",
             "date": "2024-01-01", "createdAt": "x", "updatedAt": "x"},
            {"id": "b", "description": "Bad", "amount": -3, "category": "Food",
             "date": "2024-01-01", "createdAt": "x", "updatedAt": "x"}
        ],
        "budgetCap": 99
    });
    let err = state.import(&bundle).unwrap_err();
    assert!(matches!(
        err,
        StateError::Import(ImportError::InvalidField { position: 2, field: "amount" })
    ));
    assert_eq!(err.to_string(), "Transaction 2: missing or invalid \"amount\"");
    // Nothing was applied
    assert_eq!(state.transactions().len(), 1);
    assert!(!state.budget_cap().is_set());
}

#[test]
fn test_import_applies_only_well_typed_parts() {
    let mut state = fresh();
    let bundle = json!({
        "transactions": "not a list",
        "settings": 7,
        "categories": ["Rent", "Food", "Rent"],
        "budgetCap": 120
    });
    let summary = state.import(&bundle).unwrap().value;
    assert_eq!(summary.transactions, None);
    assert!(!summary.settings);
    assert_eq!(summary.categories, Some(2));
    assert!(summary.budget_cap);
    assert_eq!(summary.message(), "Imported 2 categories, budget cap");
    assert_eq!(state.settings(), &Settings::default());
}

#[test]
fn test_import_non_object() {
    let mut state = fresh();
    assert!(matches!(
        state.import(&json!([1, 2])),
        Err(StateError::Import(ImportError::NotAnObject))
    ));
    let empty = state.import(&json!({})).unwrap().value;
    assert!(empty.is_empty());
    assert_eq!(empty.message(), "Nothing to import");
}

#[test]
fn test_write_csv() {
    let mut state = fresh();
    let txn = state
        .add_transaction(&input("Coffee, large", "4.5", "Food", "2024-03-01"))
        .unwrap()
        .value;

    let mut out = Vec::new();
    state.write_csv(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("id,date,description,category,amount,createdAt,updatedAt")
    );
    let row = lines.next().unwrap();
    assert!(row.starts_with(&format!("{},2024-03-01,\"Coffee, large\",Food,4.50,", txn.id)));
    assert_eq!(lines.next(), None);
}

#[test]
fn test_write_csv_empty_has_header() {
    let state = fresh();
    let mut out = Vec::new();
    state.write_csv(&mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "id,date,description,category,amount,createdAt,updatedAt\n"
    );
}
