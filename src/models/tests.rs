#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::*;

// ── Transaction ───────────────────────────────────────────────

fn make_txn(amount: Decimal) -> Transaction {
    Transaction::new("Lunch".into(), amount, "Food".into(), "2024-01-15".into())
}

#[test]
fn test_new_transaction_defaults() {
    let txn = make_txn(dec!(12.50));
    assert!(txn.id.starts_with("txn_"));
    assert_eq!(txn.created_at, txn.updated_at);
    assert!(!txn.created_at.is_empty());
}

#[test]
fn test_ids_are_unique() {
    let a = make_txn(dec!(1));
    let b = make_txn(dec!(1));
    assert_ne!(a.id, b.id);
}

#[test]
fn test_amount_text_two_decimals() {
    assert_eq!(make_txn(dec!(12.5)).amount_text(), "12.50");
    assert_eq!(make_txn(dec!(0)).amount_text(), "0.00");
    assert_eq!(make_txn(dec!(1234.56)).amount_text(), "1234.56");
}

#[test]
fn test_month_bucket() {
    assert_eq!(make_txn(dec!(1)).month(), Some("2024-01"));
}

#[test]
fn test_transaction_json_shape() {
    let txn = make_txn(dec!(12.34));
    let value = serde_json::to_value(&txn).unwrap();
    assert_eq!(value["amount"].to_string(), "12.34");
    assert!(value.get("createdAt").is_some());
    assert!(value.get("updatedAt").is_some());

    let back: Transaction = serde_json::from_value(value).unwrap();
    assert_eq!(back, txn);
}

#[test]
fn test_large_amounts_keep_every_digit_in_json() {
    for amount in [MAX_AMOUNT, dec!(12345678901.23), dec!(0.01)] {
        let txn = make_txn(amount);
        let json = serde_json::to_string(&txn).unwrap();
        assert!(json.contains(&format!("\"amount\":{amount}")), "{json}");
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back.amount, amount);
    }
}

#[test]
fn test_input_from_transaction() {
    let txn = make_txn(dec!(3));
    let input = TransactionInput::from_transaction(&txn);
    assert_eq!(input.amount, "3.00");
    assert_eq!(input.description, "Lunch");
}

// ── Categories ────────────────────────────────────────────────

#[test]
fn test_default_categories() {
    let cats = Categories::defaults();
    assert_eq!(cats.len(), DEFAULT_CATEGORIES.len());
    assert!(cats.contains("Food"));
    assert!(cats.contains("Books"));
}

#[test]
fn test_categories_unique_and_ordered() {
    let mut cats = Categories::from_names(vec!["B".into(), "A".into(), "B".into()]);
    assert_eq!(cats.as_slice(), ["B".to_string(), "A".to_string()]);
    assert!(!cats.insert("A".into()));
    assert!(cats.insert("C".into()));
    assert_eq!(cats.len(), 3);
}

#[test]
fn test_categories_remove() {
    let mut cats = Categories::defaults();
    assert!(cats.remove("Food"));
    assert!(!cats.remove("Food"));
    assert!(!cats.contains("Food"));
}

// ── Settings ──────────────────────────────────────────────────

#[test]
fn test_currency_parse() {
    assert_eq!(Currency::parse("usd"), Some(Currency::Usd));
    assert_eq!(Currency::parse(" EUR "), Some(Currency::Eur));
    assert_eq!(Currency::parse("XYZ"), None);
    for c in Currency::all() {
        assert_eq!(Currency::parse(c.as_str()), Some(*c));
    }
}

#[test]
fn test_convert_from_base() {
    let settings = Settings::default();
    assert_eq!(settings.convert(dec!(10), Currency::Usd), Some(dec!(10)));
    assert_eq!(settings.convert(dec!(10), Currency::Eur), Some(dec!(9.20)));
    assert_eq!(settings.convert(dec!(2), Currency::Rwf), Some(dec!(2600)));
}

#[test]
fn test_convert_with_non_usd_base() {
    let settings = Settings {
        base_currency: Currency::Eur,
        ..Settings::default()
    };
    // 0.92 EUR per USD, so 9.20 EUR is 10 USD
    assert_eq!(settings.convert(dec!(9.20), Currency::Usd), Some(dec!(10)));
}

#[test]
fn test_convert_missing_rate() {
    let mut settings = Settings::default();
    settings.rates.remove("GBP");
    assert_eq!(settings.convert(dec!(5), Currency::Gbp), None);
}

#[test]
fn test_convert_overflow_is_none() {
    let settings = Settings::default();
    assert_eq!(settings.convert(Decimal::MAX, Currency::Rwf), None);
    assert_eq!(
        settings.convert(MAX_AMOUNT, Currency::Rwf),
        Some(dec!(1299999999999987))
    );
}

#[test]
fn test_set_rate_rejects_non_positive() {
    let mut settings = Settings::default();
    assert!(!settings.set_rate(Currency::Eur, dec!(0)));
    assert!(!settings.set_rate(Currency::Eur, dec!(-1)));
    assert!(settings.set_rate(Currency::Eur, dec!(0.95)));
    assert_eq!(settings.rates["EUR"], dec!(0.95));
}

#[test]
fn test_settings_json_roundtrip() {
    let settings = Settings::default();
    let json = serde_json::to_string(&settings).unwrap();
    assert!(json.contains("\"baseCurrency\":\"USD\""));
    let back: Settings = serde_json::from_str(&json).unwrap();
    assert_eq!(back, settings);
}

// ── BudgetCap ─────────────────────────────────────────────────

#[test]
fn test_budget_cap() {
    assert!(!BudgetCap::UNSET.is_set());
    assert!(BudgetCap::new(dec!(-1)).is_none());
    let cap = BudgetCap::new(dec!(500)).unwrap();
    assert!(cap.is_set());
    assert_eq!(cap.amount(), dec!(500));
    assert!(!BudgetCap::new(Decimal::ZERO).unwrap().is_set());
    assert_eq!(BudgetCap::new(MAX_AMOUNT).unwrap().amount(), MAX_AMOUNT);
    assert!(BudgetCap::new(MAX_AMOUNT + dec!(0.01)).is_none());
}
