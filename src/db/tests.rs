#![allow(clippy::unwrap_used)]

use super::*;
use crate::models::{BudgetCap, Categories, Currency, Settings, Transaction};
use rust_decimal_macros::dec;

/// A store whose every operation fails, standing in for a full disk or a
/// locked database file.
struct BrokenStore;

impl KeyValueStore for BrokenStore {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        anyhow::bail!("store unavailable")
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
        anyhow::bail!("store unavailable")
    }

    fn remove(&mut self, _key: &str) -> Result<()> {
        anyhow::bail!("store unavailable")
    }
}

fn make_txn(description: &str) -> Transaction {
    Transaction::new(description.into(), dec!(12.50), "Food".into(), "2024-01-15".into())
}

// ── Database ──────────────────────────────────────────────────

#[test]
fn test_kv_crud() {
    let mut db = Database::open_in_memory().unwrap();
    assert_eq!(db.get("missing").unwrap(), None);

    db.set("a", "1").unwrap();
    assert_eq!(db.get("a").unwrap(), Some("1".into()));

    db.set("a", "2").unwrap();
    assert_eq!(db.get("a").unwrap(), Some("2".into()));
    assert_eq!(db.key_count().unwrap(), 1);

    db.remove("a").unwrap();
    assert_eq!(db.get("a").unwrap(), None);
    // Removing twice is fine
    db.remove("a").unwrap();
}

#[test]
fn test_reopen_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fintrack.db");
    {
        let mut db = Database::open(&path).unwrap();
        db.set("k", "v").unwrap();
    }
    // Second open runs migrate() against an existing schema
    let db = Database::open(&path).unwrap();
    assert_eq!(db.get("k").unwrap(), Some("v".into()));
}

fn schema_versions(db: &Database) -> Vec<i32> {
    let mut stmt = db.conn.prepare("SELECT version FROM schema_version").unwrap();
    let versions = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<rusqlite::Result<Vec<i32>>>()
        .unwrap();
    versions
}

#[test]
fn test_migrate_records_version_once() {
    let mut db = Database::open_in_memory().unwrap();
    db.migrate().unwrap();
    db.migrate().unwrap();
    assert_eq!(schema_versions(&db), vec![schema::CURRENT_VERSION]);
}

#[test]
fn test_migrate_repairs_partial_schema() {
    // Version table present but empty, kv table missing
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE schema_version (version INTEGER NOT NULL);")
        .unwrap();
    let mut db = Database { conn };
    db.migrate().unwrap();
    assert_eq!(schema_versions(&db), vec![schema::CURRENT_VERSION]);
    db.set("k", "v").unwrap();
    assert_eq!(db.get("k").unwrap(), Some("v".into()));
}

#[test]
fn test_migrate_bumps_old_version() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(schema::SCHEMA_V1).unwrap();
    conn.execute("INSERT INTO schema_version (version) VALUES (0)", [])
        .unwrap();
    let mut db = Database { conn };
    db.migrate().unwrap();
    assert_eq!(schema_versions(&db), vec![schema::CURRENT_VERSION]);
}

#[test]
fn test_open_bad_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-such-dir").join("fintrack.db");
    assert!(Database::open(&path).is_err());
}

// ── Storage defaults ──────────────────────────────────────────

#[test]
fn test_defaults_when_empty() {
    let storage = Storage::new(MemoryStore::default());
    assert!(storage.load_transactions().is_empty());
    assert_eq!(storage.load_categories(), Categories::defaults());
    assert_eq!(storage.load_settings(), Settings::default());
    assert_eq!(storage.load_budget_cap(), BudgetCap::UNSET);
}

#[test]
fn test_defaults_when_corrupt() {
    let mut storage = Storage::new(MemoryStore::default());
    for key in keys::ALL {
        storage.store_mut().set(key, "{not json").unwrap();
    }
    assert!(storage.load_transactions().is_empty());
    assert_eq!(storage.load_categories(), Categories::defaults());
    assert_eq!(storage.load_settings(), Settings::default());
    assert_eq!(storage.load_budget_cap(), BudgetCap::UNSET);
}

#[test]
fn test_negative_cap_is_ignored() {
    let mut storage = Storage::new(MemoryStore::default());
    storage.store_mut().set(keys::BUDGET_CAP, "-5").unwrap();
    assert_eq!(storage.load_budget_cap(), BudgetCap::UNSET);
}

// ── Storage roundtrip ─────────────────────────────────────────

#[test]
fn test_save_and_load_everything() {
    let mut storage = Storage::new(Database::open_in_memory().unwrap());

    let txns = vec![make_txn("Lunch"), make_txn("Dinner")];
    assert!(storage.save_transactions(&txns));
    assert_eq!(storage.load_transactions(), txns);

    let cats = Categories::from_names(vec!["Food".into(), "Rent".into()]);
    assert!(storage.save_categories(&cats));
    assert_eq!(storage.load_categories(), cats);

    let mut settings = Settings::default();
    settings.base_currency = Currency::Eur;
    settings.set_rate(Currency::Gbp, dec!(0.85));
    assert!(storage.save_settings(&settings));
    assert_eq!(storage.load_settings(), settings);

    let cap = BudgetCap::new(dec!(750.25)).unwrap();
    assert!(storage.save_budget_cap(cap));
    assert_eq!(storage.load_budget_cap(), cap);
}

#[test]
fn test_large_amounts_are_stored_exactly() {
    let mut storage = Storage::new(Database::open_in_memory().unwrap());
    let mut txn = make_txn("Deposit");
    txn.amount = dec!(999999999999.99);
    assert!(storage.save_transactions(std::slice::from_ref(&txn)));
    assert_eq!(storage.load_transactions(), vec![txn]);

    let raw = storage.store().get(keys::TRANSACTIONS).unwrap().unwrap();
    assert!(raw.contains("\"amount\":999999999999.99"), "{raw}");

    let cap = BudgetCap::new(dec!(123456789012.34)).unwrap();
    assert!(storage.save_budget_cap(cap));
    assert_eq!(storage.load_budget_cap(), cap);
}

#[test]
fn test_values_are_json() {
    let mut storage = Storage::new(MemoryStore::default());
    storage.save_transactions(&[make_txn("Lunch")]);
    let raw = storage.store().get(keys::TRANSACTIONS).unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value[0]["description"], "Lunch");
    assert_eq!(value[0]["amount"], 12.5);
}

#[test]
fn test_clear_all() {
    let mut storage = Storage::new(Database::open_in_memory().unwrap());
    storage.save_transactions(&[make_txn("Lunch")]);
    storage.save_budget_cap(BudgetCap::new(dec!(10)).unwrap());
    storage.store_mut().set("unrelated", "x").unwrap();

    assert!(storage.clear_all());
    assert!(storage.load_transactions().is_empty());
    assert_eq!(storage.load_budget_cap(), BudgetCap::UNSET);
    // Keys we do not own are left alone
    assert_eq!(storage.store().key_count().unwrap(), 1);
}

// ── Failures ──────────────────────────────────────────────────

#[test]
fn test_broken_store_reads_defaults() {
    let storage = Storage::new(BrokenStore);
    assert!(storage.load_transactions().is_empty());
    assert_eq!(storage.load_categories(), Categories::defaults());
    assert_eq!(storage.load_budget_cap(), BudgetCap::UNSET);
}

#[test]
fn test_broken_store_writes_report_failure() {
    let mut storage = Storage::new(BrokenStore);
    assert!(!storage.save_transactions(&[make_txn("Lunch")]));
    assert!(!storage.save_categories(&Categories::defaults()));
    assert!(!storage.save_settings(&Settings::default()));
    assert!(!storage.save_budget_cap(BudgetCap::UNSET));
    assert!(!storage.clear_all());
}
