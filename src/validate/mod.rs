//! Field and record validation for transactions, plus structural checks for
//! externally supplied import bundles.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

use crate::models::{TransactionInput, MAX_AMOUNT};

const MAX_INTEGER_DIGITS: usize = 12;

// ASCII digit classes: `\d` would also admit other scripts' digits.
static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^(0|[1-9][0-9]*)(\.[0-9]{1,2})?$"));
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^[0-9]{4}-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01])$"));
static CATEGORY_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^[A-Za-z]+(?:[ -][A-Za-z]+)*$"));
static WORD_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"\w+"));

#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern must compile")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum ValidationError {
    #[error("{0} is required")]
    Required(Field),
    #[error("Description cannot start or end with whitespace")]
    SurroundingWhitespace,
    #[error("Description repeats the word \"{0}\"")]
    DuplicateWord(String),
    #[error("Amount must be a number with up to 2 decimal places (e.g. 12.50)")]
    AmountFormat,
    #[error("Amount cannot be negative")]
    NegativeAmount,
    #[error("Amount cannot exceed 999,999,999,999.99")]
    AmountTooLarge,
    #[error("Date must be in YYYY-MM-DD format")]
    DateFormat,
    #[error("{0} is not a real calendar date")]
    NoSuchDate(String),
    #[error("Category may only contain letters, single spaces and hyphens")]
    CategoryFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Field {
    Description,
    Amount,
    Category,
    Date,
}

impl Field {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Amount => "amount",
            Self::Category => "category",
            Self::Date => "date",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.as_str();
        let mut chars = name.chars();
        if let Some(first) = chars.next() {
            write!(f, "{}{}", first.to_uppercase(), chars.as_str())?;
        }
        Ok(())
    }
}

/// Every failing field of a record, keyed by field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
#[error("{}", summary(.0))]
pub(crate) struct FieldErrors(pub(crate) BTreeMap<Field, ValidationError>);

fn summary(errors: &BTreeMap<Field, ValidationError>) -> String {
    errors
        .values()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl FieldErrors {
    pub(crate) fn get(&self, field: Field) -> Option<&ValidationError> {
        self.0.get(&field)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }
}

pub(crate) fn validate_description(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required(Field::Description));
    }
    if value.trim() != value {
        return Err(ValidationError::SurroundingWhitespace);
    }
    if let Some(word) = find_duplicate_word(value) {
        return Err(ValidationError::DuplicateWord(word));
    }
    Ok(())
}

/// Two equal words (ignoring case) with nothing but whitespace between them.
fn find_duplicate_word(text: &str) -> Option<String> {
    let mut prev: Option<regex::Match> = None;
    for word in WORD_RE.find_iter(text) {
        if let Some(p) = prev {
            let gap = &text[p.end()..word.start()];
            let only_space = !gap.is_empty() && gap.chars().all(char::is_whitespace);
            if only_space && p.as_str().to_lowercase() == word.as_str().to_lowercase() {
                return Some(word.as_str().to_lowercase());
            }
        }
        prev = Some(word);
    }
    None
}

pub(crate) fn validate_amount(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Required(Field::Amount));
    }
    let Some(caps) = AMOUNT_RE.captures(value) else {
        return Err(ValidationError::AmountFormat);
    };
    // Bounded before parsing; long digit runs do not fit a Decimal.
    if caps[1].len() > MAX_INTEGER_DIGITS {
        return Err(ValidationError::AmountTooLarge);
    }
    match Decimal::from_str(value) {
        Ok(amount) if amount < Decimal::ZERO => Err(ValidationError::NegativeAmount),
        Ok(amount) if amount > MAX_AMOUNT => Err(ValidationError::AmountTooLarge),
        Ok(_) => Ok(()),
        Err(_) => Err(ValidationError::AmountFormat),
    }
}

/// Exact value of a JSON number, including exponent forms like `1e3`.
pub(crate) fn json_decimal(value: &serde_json::Value) -> Option<Decimal> {
    let text = value.as_number()?.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

pub(crate) fn validate_date(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Required(Field::Date));
    }
    if !DATE_RE.is_match(value) {
        return Err(ValidationError::DateFormat);
    }
    parse_calendar_date(value)
        .map(|_| ())
        .ok_or_else(|| ValidationError::NoSuchDate(value.to_string()))
}

/// Build the date from its parts and require the same year/month/day back.
fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    let mut parts = value.splitn(3, '-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    (date.year() == year && date.month() == month && date.day() == day).then_some(date)
}

pub(crate) fn validate_category(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Required(Field::Category));
    }
    if !CATEGORY_RE.is_match(value) {
        return Err(ValidationError::CategoryFormat);
    }
    Ok(())
}

/// Run every field check; all failures are reported together.
pub(crate) fn validate_transaction(input: &TransactionInput) -> Result<(), FieldErrors> {
    let checks = [
        (Field::Description, validate_description(&input.description)),
        (Field::Amount, validate_amount(&input.amount)),
        (Field::Category, validate_category(&input.category)),
        (Field::Date, validate_date(&input.date)),
    ];
    let errors: BTreeMap<Field, ValidationError> = checks
        .into_iter()
        .filter_map(|(field, result)| result.err().map(|e| (field, e)))
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(FieldErrors(errors))
    }
}

// ── Import bundles ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum ImportError {
    #[error("Import data must be a JSON object")]
    NotAnObject,
    #[error("\"transactions\" must be an array")]
    TransactionsNotArray,
    #[error("Transaction {position} is not an object")]
    NotARecord { position: usize },
    #[error("Transaction {position}: missing or invalid \"{field}\"")]
    InvalidField { position: usize, field: &'static str },
    #[error("Transaction {position}: duplicate id \"{id}\"")]
    DuplicateId { position: usize, id: String },
    #[error("Transaction {position} could not be read: {reason}")]
    Unreadable { position: usize, reason: String },
}

/// Structural check of an untrusted list of transactions. The first bad
/// record rejects the whole list; positions are 1-based.
pub(crate) fn validate_import(transactions: &serde_json::Value) -> Result<(), ImportError> {
    let records = transactions
        .as_array()
        .ok_or(ImportError::TransactionsNotArray)?;
    let mut seen = HashSet::new();
    for (i, record) in records.iter().enumerate() {
        let position = i + 1;
        let obj = record
            .as_object()
            .ok_or(ImportError::NotARecord { position })?;
        let invalid = |field| ImportError::InvalidField { position, field };

        let non_empty = |field: &'static str| {
            obj.get(field)
                .and_then(|v| v.as_str())
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| invalid(field))
        };

        let id = non_empty("id")?;
        non_empty("description")?;
        let amount = obj
            .get("amount")
            .and_then(json_decimal)
            .ok_or_else(|| invalid("amount"))?;
        if amount < Decimal::ZERO || amount > MAX_AMOUNT {
            return Err(invalid("amount"));
        }
        non_empty("category")?;
        let date = obj
            .get("date")
            .and_then(|v| v.as_str())
            .ok_or_else(|| invalid("date"))?;
        if !DATE_RE.is_match(date) {
            return Err(invalid("date"));
        }
        non_empty("createdAt")?;
        non_empty("updatedAt")?;

        if !seen.insert(id) {
            return Err(ImportError::DuplicateId {
                position,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}
