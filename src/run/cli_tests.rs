#![allow(clippy::unwrap_used)]

use super::*;
use crate::db::{KeyValueStore, MemoryStore, Storage};
use crate::state::AppState;
use rust_decimal_macros::dec;

fn session() -> Session {
    let store: Box<dyn KeyValueStore> = Box::new(MemoryStore::default());
    AppState::load(Storage::new(store))
}

fn argv(words: &[&str]) -> Vec<String> {
    std::iter::once("fintrack")
        .chain(words.iter().copied())
        .map(String::from)
        .collect()
}

fn run(words: &[&str], state: &mut Session) -> Result<()> {
    as_cli(&argv(words), state)
}

// ── Argument helpers ─────────────────────────────────────────

#[test]
fn test_flag_value_and_positional() {
    let args: Vec<String> = ["Lunch", "9.50", "Food", "--date", "2024-05-01", "--case"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(flag_value(&args, "--date"), Some("2024-05-01"));
    assert_eq!(flag_value(&args, "--case"), None);
    assert!(has_flag(&args, "--case"));
    assert_eq!(positional(&args), vec!["Lunch", "9.50", "Food"]);
}

#[test]
fn test_shellexpand_leaves_plain_paths() {
    assert_eq!(shellexpand("/tmp/out.json"), "/tmp/out.json");
    assert!(!shellexpand("~/out.json").starts_with('~'));
}

#[test]
fn test_short_id() {
    assert_eq!(short_id("txn_0123456789abcdef"), "txn_01234567");
    assert_eq!(short_id("abc"), "abc");
}

// ── Transactions ─────────────────────────────────────────────

#[test]
fn test_add_edit_delete_by_prefix() {
    let mut state = session();
    run(&["add", "Lunch", "9.50", "Food", "--date", "2024-05-01"], &mut state).unwrap();
    assert_eq!(state.transactions().len(), 1);
    let id = state.transactions()[0].id.clone();

    run(&["edit", &id[..10], "--amount", "11"], &mut state).unwrap();
    assert_eq!(state.transactions()[0].amount, dec!(11));
    assert_eq!(state.transactions()[0].description, "Lunch");

    run(&["delete", &id[..10]], &mut state).unwrap();
    assert!(state.transactions().is_empty());
}

#[test]
fn test_add_rejects_bad_fields() {
    let mut state = session();
    let err = run(&["add", "x", "abc", "Food", "--date", "2024-02-30"], &mut state).unwrap_err();
    assert!(err.downcast_ref::<StateError>().is_some());
    assert!(state.transactions().is_empty());

    assert!(run(&["add", "Lunch", "9.50"], &mut state).is_err());
}

#[test]
fn test_edit_needs_a_change() {
    let mut state = session();
    run(&["add", "Lunch", "9.50", "Food"], &mut state).unwrap();
    let id = state.transactions()[0].id.clone();
    assert!(run(&["edit", &id], &mut state).is_err());
}

#[test]
fn test_resolve_id_errors() {
    let mut state = session();
    assert!(resolve_id(&state, "").is_err());
    assert!(resolve_id(&state, "nope").is_err());
    run(&["add", "Lunch", "9.50", "Food"], &mut state).unwrap();
    run(&["add", "Dinner", "20", "Food"], &mut state).unwrap();
    let first = state.transactions()[0].id.clone();
    assert_eq!(resolve_id(&state, &first).unwrap(), first);
}

#[test]
fn test_list_rejects_invalid_pattern() {
    let mut state = session();
    run(&["add", "Lunch", "9.50", "Food"], &mut state).unwrap();
    assert!(run(&["list", "--search", "("], &mut state).is_err());
    run(&["list", "--search", "lun", "--mark", "--sort", "amount-asc"], &mut state).unwrap();
}

// ── Settings and data ────────────────────────────────────────

#[test]
fn test_budget_currency_rate() {
    let mut state = session();
    run(&["budget", "250"], &mut state).unwrap();
    assert_eq!(state.budget_cap().amount(), dec!(250));
    assert!(run(&["budget", "-5"], &mut state).is_err());
    run(&["budget", "0"], &mut state).unwrap();
    assert!(!state.budget_cap().is_set());

    run(&["currency", "GBP"], &mut state).unwrap();
    assert_eq!(state.settings().base_currency, Currency::Gbp);
    assert!(run(&["currency", "JPY"], &mut state).is_err());

    run(&["rate", "EUR", "1.17"], &mut state).unwrap();
    assert_eq!(state.settings().rates.get("EUR"), Some(&dec!(1.17)));
    assert!(run(&["rate", "EUR"], &mut state).is_err());
}

#[test]
fn test_category_commands() {
    let mut state = session();
    run(&["add-category", "Home", "Office"], &mut state).unwrap();
    assert!(state.categories().contains("Home Office"));
    assert!(run(&["add-category", "Home", "Office"], &mut state).is_err());
    run(&["delete-category", "Home", "Office"], &mut state).unwrap();
    assert!(!state.categories().contains("Home Office"));
}

#[test]
fn test_export_import_and_clear() {
    let mut state = session();
    run(&["add", "Lunch", "9.50", "Food", "--date", "2024-05-01"], &mut state).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("backup.json");
    let json = json.to_str().unwrap();

    run(&["export", json], &mut state).unwrap();
    assert!(run(&["clear"], &mut state).is_err());
    assert_eq!(state.transactions().len(), 1);
    run(&["clear", "--yes"], &mut state).unwrap();
    assert!(state.transactions().is_empty());

    run(&["import", json], &mut state).unwrap();
    assert_eq!(state.transactions().len(), 1);
    assert_eq!(state.transactions()[0].amount, dec!(9.50));
}

#[test]
fn test_unknown_command() {
    let mut state = session();
    assert!(run(&["frobnicate"], &mut state).is_err());
}
