use chrono::NaiveDate;
use regex::{Regex, RegexBuilder};
use std::cmp::Ordering;
use std::ops::Range;
use tracing::{debug, warn};

use crate::models::Transaction;

/// Patterns above this compiled size are refused rather than built.
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// A compiled search expression.
#[derive(Debug, Clone, Default)]
pub(crate) enum Query {
    /// Blank input: every record passes.
    #[default]
    All,
    Pattern(Regex),
    /// The input did not compile. Nothing matches, nothing is highlighted.
    Invalid { error: String },
}

impl Query {
    /// Compile user input. Never fails: a bad pattern becomes `Query::Invalid`.
    pub(crate) fn compile(input: &str, case_sensitive: bool) -> Self {
        if input.trim().is_empty() {
            return Self::All;
        }
        match RegexBuilder::new(input)
            .case_insensitive(!case_sensitive)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
        {
            Ok(re) => Self::Pattern(re),
            Err(e) => {
                warn!(pattern = input, error = %e, "invalid search pattern");
                Self::Invalid {
                    error: e.to_string(),
                }
            }
        }
    }

    pub(crate) fn is_match(&self, text: &str) -> bool {
        match self {
            Self::All => true,
            Self::Pattern(re) => re.is_match(text),
            Self::Invalid { .. } => false,
        }
    }

    pub(crate) fn error(&self) -> Option<&str> {
        match self {
            Self::Invalid { error } => Some(error),
            _ => None,
        }
    }

    /// Byte ranges of every non-overlapping, non-empty match.
    pub(crate) fn match_ranges(&self, text: &str) -> Vec<Range<usize>> {
        match self {
            Self::Pattern(re) => re
                .find_iter(text)
                .filter(|m| !m.is_empty())
                .map(|m| m.range())
                .collect(),
            _ => Vec::new(),
        }
    }

    fn matches_transaction(&self, txn: &Transaction) -> bool {
        match self {
            Self::All => true,
            Self::Invalid { .. } => false,
            Self::Pattern(_) => {
                self.is_match(&txn.description)
                    || self.is_match(&txn.amount_text())
                    || self.is_match(&txn.category)
                    || self.is_match(&txn.date)
            }
        }
    }
}

// ── Highlighting ──────────────────────────────────────────────

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape `text` and wrap every match in `<mark>`. Matches are found on the
/// raw text and each piece is escaped exactly once, so markup in the input
/// can never leak through and entities are never double-escaped.
pub(crate) fn highlight(text: &str, query: &Query) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for range in query.match_ranges(text) {
        out.push_str(&escape_html(&text[last..range.start]));
        out.push_str("<mark>");
        out.push_str(&escape_html(&text[range.clone()]));
        out.push_str("</mark>");
        last = range.end;
    }
    out.push_str(&escape_html(&text[last..]));
    out
}

// ── Filtering ─────────────────────────────────────────────────

/// Keep records whose category equals `category` exactly. None or an empty
/// string keeps everything.
pub(crate) fn filter_by_category<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
    category: Option<&str>,
) -> Vec<&'a Transaction> {
    match category.filter(|c| !c.is_empty()) {
        None => transactions.into_iter().collect(),
        Some(cat) => transactions
            .into_iter()
            .filter(|t| t.category == cat)
            .collect(),
    }
}

pub(crate) fn search_transactions<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
    query: &Query,
) -> Vec<&'a Transaction> {
    transactions
        .into_iter()
        .filter(|t| query.matches_transaction(t))
        .collect()
}

// ── Sorting ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum SortKey {
    #[default]
    DateDesc,
    DateAsc,
    DescriptionAsc,
    DescriptionDesc,
    AmountAsc,
    AmountDesc,
    /// Keep the collection order (newest entry first).
    Insertion,
}

impl SortKey {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::DateDesc => "date-desc",
            Self::DateAsc => "date-asc",
            Self::DescriptionAsc => "description-asc",
            Self::DescriptionDesc => "description-desc",
            Self::AmountAsc => "amount-asc",
            Self::AmountDesc => "amount-desc",
            Self::Insertion => "insertion",
        }
    }

    /// Unrecognised keys fall back to insertion order.
    pub(crate) fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "date-desc" | "date" => Self::DateDesc,
            "date-asc" => Self::DateAsc,
            "description-asc" | "description" | "desc-asc" => Self::DescriptionAsc,
            "description-desc" | "desc-desc" => Self::DescriptionDesc,
            "amount-asc" => Self::AmountAsc,
            "amount-desc" | "amount" => Self::AmountDesc,
            _ => Self::Insertion,
        }
    }

    pub(crate) fn all() -> &'static [SortKey] {
        &[
            Self::DateDesc,
            Self::DateAsc,
            Self::DescriptionAsc,
            Self::DescriptionDesc,
            Self::AmountAsc,
            Self::AmountDesc,
        ]
    }

    pub(crate) fn next(&self) -> Self {
        let all = Self::all();
        let idx = all.iter().position(|k| k == self).unwrap_or(all.len() - 1);
        all[(idx + 1) % all.len()]
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn date_key(txn: &Transaction) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&txn.date, "%Y-%m-%d").ok()
}

/// Case-folded comparison first so "apple" sits next to "Apple", then the
/// exact text to keep the order total.
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Returns a new ordering; the input is left untouched. Sorting is stable.
pub(crate) fn sort_transactions<'a>(
    transactions: &[&'a Transaction],
    key: SortKey,
) -> Vec<&'a Transaction> {
    let mut sorted = transactions.to_vec();
    match key {
        SortKey::DateDesc => sorted.sort_by(|a, b| date_key(b).cmp(&date_key(a))),
        SortKey::DateAsc => sorted.sort_by_key(|t| date_key(t)),
        SortKey::DescriptionAsc => {
            sorted.sort_by(|a, b| compare_text(&a.description, &b.description))
        }
        SortKey::DescriptionDesc => {
            sorted.sort_by(|a, b| compare_text(&b.description, &a.description))
        }
        SortKey::AmountAsc => sorted.sort_by(|a, b| a.amount.cmp(&b.amount)),
        SortKey::AmountDesc => sorted.sort_by(|a, b| b.amount.cmp(&a.amount)),
        SortKey::Insertion => {}
    }
    sorted
}

// ── Composed view ─────────────────────────────────────────────

/// Everything the transaction list needs to decide what to show.
#[derive(Debug, Clone, Default)]
pub(crate) struct View {
    pub(crate) query: Query,
    pub(crate) category: Option<String>,
    pub(crate) sort: SortKey,
}

impl View {
    /// Category filter, then search, then sort.
    pub(crate) fn apply<'a>(&self, transactions: &'a [Transaction]) -> Vec<&'a Transaction> {
        let by_category = filter_by_category(transactions, self.category.as_deref());
        let matched = search_transactions(by_category, &self.query);
        let sorted = sort_transactions(&matched, self.sort);
        debug!(
            total = transactions.len(),
            shown = sorted.len(),
            sort = %self.sort,
            "recomputed transaction view"
        );
        sorted
    }
}
