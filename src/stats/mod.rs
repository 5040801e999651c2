use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

use crate::models::{BudgetCap, Transaction};

/// Label used for the top category when there is nothing to rank.
pub(crate) const NO_CATEGORY: &str = "None";

/// Number of months kept by the monthly trend.
pub(crate) const TREND_MONTHS: usize = 6;

const WEEK_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Stats {
    pub(crate) total: usize,
    pub(crate) total_expenses: Decimal,
    pub(crate) top_category: String,
    pub(crate) top_category_amount: Decimal,
    pub(crate) week_total: Decimal,
    /// Today and the six days before it, oldest first.
    pub(crate) daily_totals: Vec<(NaiveDate, Decimal)>,
    /// Per-category sums in first-seen order.
    pub(crate) category_totals: Vec<(String, Decimal)>,
}

fn parse_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

// Sums saturate at Decimal::MAX rather than overflow.

/// Per-category sums, keyed in the order categories are first met.
pub(crate) fn category_totals(transactions: &[Transaction]) -> Vec<(String, Decimal)> {
    let mut totals: Vec<(String, Decimal)> = Vec::new();
    for txn in transactions {
        match totals.iter_mut().find(|(name, _)| *name == txn.category) {
            Some((_, sum)) => *sum = sum.saturating_add(txn.amount),
            None => totals.push((txn.category.clone(), txn.amount)),
        }
    }
    totals
}

pub(crate) fn calculate_stats(transactions: &[Transaction], today: NaiveDate) -> Stats {
    let total_expenses = transactions
        .iter()
        .fold(Decimal::ZERO, |sum, t| sum.saturating_add(t.amount));
    let category_totals = category_totals(transactions);

    // Strictly greater, so the first category seen wins a tie.
    let mut top: Option<&(String, Decimal)> = None;
    for entry in &category_totals {
        match top {
            Some((_, best)) if entry.1 <= *best => {}
            _ => top = Some(entry),
        }
    }
    let (top_category, top_category_amount) = top
        .map(|(name, sum)| (name.clone(), *sum))
        .unwrap_or_else(|| (NO_CATEGORY.to_string(), Decimal::ZERO));

    let week_start = today - Duration::days(WEEK_DAYS - 1);
    let mut daily_totals: Vec<(NaiveDate, Decimal)> = (0..WEEK_DAYS)
        .map(|offset| (week_start + Duration::days(offset), Decimal::ZERO))
        .collect();
    let mut week_total = Decimal::ZERO;

    for txn in transactions {
        let Some(date) = parse_date(&txn.date) else {
            continue;
        };
        if date < week_start || date > today {
            continue;
        }
        week_total = week_total.saturating_add(txn.amount);
        if let Some((_, sum)) = daily_totals.iter_mut().find(|(d, _)| *d == date) {
            *sum = sum.saturating_add(txn.amount);
        }
    }

    Stats {
        total: transactions.len(),
        total_expenses,
        top_category,
        top_category_amount,
        week_total,
        daily_totals,
        category_totals,
    }
}

// ── Chart data ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CategoryShare {
    pub(crate) category: String,
    pub(crate) amount: Decimal,
    /// Fraction of the largest category, 0..=1, for bar widths.
    pub(crate) ratio: Decimal,
}

/// Category sums, largest first, each scaled against the largest.
pub(crate) fn category_breakdown(transactions: &[Transaction]) -> Vec<CategoryShare> {
    let mut totals = category_totals(transactions);
    totals.sort_by(|a, b| b.1.cmp(&a.1));
    let max = totals.first().map(|(_, sum)| *sum).unwrap_or_default();
    totals
        .into_iter()
        .map(|(category, amount)| CategoryShare {
            ratio: if max > Decimal::ZERO {
                amount / max
            } else {
                Decimal::ZERO
            },
            category,
            amount,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Trend {
    Increased,
    Decreased,
    Flat,
}

impl Trend {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Increased => "increased",
            Self::Decreased => "decreased",
            Self::Flat => "flat",
        }
    }

    pub(crate) fn arrow(&self) -> &'static str {
        match self {
            Self::Increased => "▲",
            Self::Decreased => "▼",
            Self::Flat => "=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MonthTotal {
    /// Format: "YYYY-MM"
    pub(crate) month: String,
    pub(crate) amount: Decimal,
    /// Change against the previous shown month; None for the first one.
    pub(crate) trend: Option<Trend>,
}

/// Spending per calendar month for the most recent months that have data.
/// Months without transactions are skipped, not filled with zero.
pub(crate) fn monthly_trend(transactions: &[Transaction]) -> Vec<MonthTotal> {
    let mut by_month: std::collections::BTreeMap<String, Decimal> = Default::default();
    for txn in transactions {
        if parse_date(&txn.date).is_none() {
            continue;
        }
        let Some(month) = txn.month() else {
            continue;
        };
        let sum = by_month.entry(month.to_string()).or_default();
        *sum = sum.saturating_add(txn.amount);
    }

    let skip = by_month.len().saturating_sub(TREND_MONTHS);
    let mut months: Vec<MonthTotal> = Vec::with_capacity(TREND_MONTHS);
    for (month, amount) in by_month.into_iter().skip(skip) {
        let trend = months.last().map(|prev| match amount.cmp(&prev.amount) {
            std::cmp::Ordering::Greater => Trend::Increased,
            std::cmp::Ordering::Less => Trend::Decreased,
            std::cmp::Ordering::Equal => Trend::Flat,
        });
        months.push(MonthTotal {
            month,
            amount,
            trend,
        });
    }
    months
}

// ── Budget ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BudgetLevel {
    Normal,
    Warning,
    Over,
}

impl BudgetLevel {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "on track",
            Self::Warning => "approaching limit",
            Self::Over => "over budget",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BudgetStatus {
    pub(crate) cap: Decimal,
    pub(crate) spent: Decimal,
    /// Share of the cap already spent, in percent (may exceed 100).
    pub(crate) percent: Decimal,
    /// Negative when over the cap.
    pub(crate) remaining: Decimal,
    pub(crate) level: BudgetLevel,
}

const WARNING_PERCENT: Decimal = Decimal::from_parts(80, 0, 0, false, 0);
const OVER_PERCENT: Decimal = Decimal::ONE_HUNDRED;

/// Compare spending with the cap. An unset cap yields nothing.
pub(crate) fn budget_status(spent: Decimal, cap: BudgetCap) -> Option<BudgetStatus> {
    if !cap.is_set() {
        return None;
    }
    let cap = cap.amount();
    let percent = spent
        .checked_div(cap)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::MAX);
    let level = if percent >= OVER_PERCENT {
        BudgetLevel::Over
    } else if percent >= WARNING_PERCENT {
        BudgetLevel::Warning
    } else {
        BudgetLevel::Normal
    };
    Some(BudgetStatus {
        cap,
        spent,
        percent,
        remaining: cap.saturating_sub(spent),
        level,
    })
}
