use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::models::{BudgetCap, Settings, Transaction, TransactionInput};
use crate::search::{Query, SortKey, View};
use crate::state::Session;
use crate::stats::{self, BudgetStatus, CategoryShare, MonthTotal, Stats};
use crate::validate::{Field, FieldErrors};

/// Quiet period after the last keystroke before the search is recomputed.
pub(crate) const SEARCH_DEBOUNCE: Duration = Duration::from_millis(250);
/// An armed destructive action is forgotten after this long.
pub(crate) const CONFIRM_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Screen {
    Dashboard,
    Transactions,
    Categories,
    Settings,
}

impl Screen {
    pub(crate) fn all() -> &'static [Screen] {
        &[
            Self::Dashboard,
            Self::Transactions,
            Self::Categories,
            Self::Settings,
        ]
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dashboard => write!(f, "Dashboard"),
            Self::Transactions => write!(f, "Transactions"),
            Self::Categories => write!(f, "Categories"),
            Self::Settings => write!(f, "Settings"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InputMode {
    Normal,
    Command,
    Search,
    Form,
}

impl std::fmt::Display for InputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "NORMAL"),
            Self::Command => write!(f, "COMMAND"),
            Self::Search => write!(f, "SEARCH"),
            Self::Form => write!(f, "FORM"),
        }
    }
}

/// Destructive actions that need a second keypress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PendingAction {
    DeleteTransaction { id: String, description: String },
    DeleteCategory { name: String },
    ClearAll,
}

impl PendingAction {
    pub(crate) fn prompt(&self) -> String {
        match self {
            Self::DeleteTransaction { description, .. } => {
                format!("Press D again to delete '{description}'")
            }
            Self::DeleteCategory { name } => format!("Press D again to delete category '{name}'"),
            Self::ClearAll => "Run :clear again to erase all data".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Armed {
    action: PendingAction,
    at: Instant,
}

/// Add/edit form for a single transaction.
#[derive(Debug, Clone, Default)]
pub(crate) struct TransactionForm {
    /// Id of the record being edited; None when adding.
    pub(crate) editing: Option<String>,
    pub(crate) input: TransactionInput,
    pub(crate) focus: usize,
    pub(crate) errors: FieldErrors,
    pub(crate) message: Option<String>,
}

impl TransactionForm {
    pub(crate) const FIELDS: [Field; 4] =
        [Field::Description, Field::Amount, Field::Category, Field::Date];

    pub(crate) fn new_entry(default_category: Option<&str>, today: NaiveDate) -> Self {
        Self {
            input: TransactionInput {
                category: default_category.unwrap_or_default().to_string(),
                date: today.format("%Y-%m-%d").to_string(),
                ..TransactionInput::default()
            },
            ..Self::default()
        }
    }

    pub(crate) fn edit(txn: &Transaction) -> Self {
        Self {
            editing: Some(txn.id.clone()),
            input: TransactionInput::from_transaction(txn),
            ..Self::default()
        }
    }

    pub(crate) fn focused(&self) -> Field {
        Self::FIELDS[self.focus % Self::FIELDS.len()]
    }

    pub(crate) fn value(&self, field: Field) -> &str {
        match field {
            Field::Description => &self.input.description,
            Field::Amount => &self.input.amount,
            Field::Category => &self.input.category,
            Field::Date => &self.input.date,
        }
    }

    pub(crate) fn value_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Description => &mut self.input.description,
            Field::Amount => &mut self.input.amount,
            Field::Category => &mut self.input.category,
            Field::Date => &mut self.input.date,
        }
    }

    pub(crate) fn next_field(&mut self) {
        self.focus = (self.focus + 1) % Self::FIELDS.len();
    }

    pub(crate) fn prev_field(&mut self) {
        self.focus = (self.focus + Self::FIELDS.len() - 1) % Self::FIELDS.len();
    }

    /// Step the category field through the known names.
    pub(crate) fn cycle_category(&mut self, categories: &[String], delta: isize) {
        if categories.is_empty() {
            return;
        }
        let len = categories.len() as isize;
        let current = categories
            .iter()
            .position(|c| *c == self.input.category)
            .map(|i| i as isize)
            .unwrap_or(-1);
        let next = (current + delta).rem_euclid(len) as usize;
        self.input.category = categories[next].clone();
    }
}

/// Per-category row on the Categories screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CategoryRow {
    pub(crate) name: String,
    pub(crate) count: usize,
    pub(crate) total: Decimal,
}

pub(crate) struct App {
    pub(crate) running: bool,
    pub(crate) screen: Screen,
    pub(crate) input_mode: InputMode,
    pub(crate) command_input: String,
    pub(crate) search_input: String,
    pub(crate) status_message: String,
    pub(crate) show_help: bool,
    pub(crate) today: NaiveDate,

    // Search / filter / sort
    pub(crate) query: Query,
    pub(crate) case_sensitive: bool,
    pub(crate) category_filter: Option<String>,
    pub(crate) sort: SortKey,
    search_edited_at: Option<Instant>,

    // Transactions
    pub(crate) transactions: Vec<Transaction>,
    pub(crate) transaction_index: usize,
    pub(crate) transaction_scroll: usize,
    pub(crate) transaction_count: usize,
    pub(crate) form: Option<TransactionForm>,

    // Dashboard
    pub(crate) stats: Stats,
    pub(crate) budget: Option<BudgetStatus>,
    pub(crate) breakdown: Vec<CategoryShare>,
    pub(crate) trend: Vec<MonthTotal>,

    // Categories
    pub(crate) categories: Vec<CategoryRow>,
    pub(crate) category_index: usize,

    // Settings
    pub(crate) settings: Settings,
    pub(crate) budget_cap: BudgetCap,
    pub(crate) settings_index: usize,

    armed: Option<Armed>,

    // Layout (updated each render frame)
    pub(crate) visible_rows: usize,
}

impl App {
    pub(crate) fn new() -> Self {
        let today = Local::now().date_naive();
        Self {
            running: true,
            screen: Screen::Dashboard,
            input_mode: InputMode::Normal,
            command_input: String::new(),
            search_input: String::new(),
            status_message: String::new(),
            show_help: false,
            today,

            query: Query::All,
            case_sensitive: false,
            category_filter: None,
            sort: SortKey::default(),
            search_edited_at: None,

            transactions: Vec::new(),
            transaction_index: 0,
            transaction_scroll: 0,
            transaction_count: 0,
            form: None,

            stats: stats::calculate_stats(&[], today),
            budget: None,
            breakdown: Vec::new(),
            trend: Vec::new(),

            categories: Vec::new(),
            category_index: 0,

            settings: Settings::default(),
            budget_cap: BudgetCap::UNSET,
            settings_index: 0,

            armed: None,

            visible_rows: 20,
        }
    }

    pub(crate) fn view(&self) -> View {
        View {
            query: self.query.clone(),
            category: self.category_filter.clone(),
            sort: self.sort,
        }
    }

    pub(crate) fn refresh_transactions(&mut self, state: &Session) {
        self.transactions = state.view(&self.view()).into_iter().cloned().collect();
        self.transaction_count = state.transactions().len();
        if self.transaction_index >= self.transactions.len() {
            self.transaction_index = self.transactions.len().saturating_sub(1);
        }
        if self.transaction_scroll > self.transaction_index {
            self.transaction_scroll = self.transaction_index;
        }
    }

    pub(crate) fn refresh_dashboard(&mut self, state: &Session) {
        self.today = Local::now().date_naive();
        self.stats = state.stats(self.today);
        self.budget = stats::budget_status(self.stats.total_expenses, state.budget_cap());
        self.breakdown = stats::category_breakdown(state.transactions());
        self.trend = stats::monthly_trend(state.transactions());
    }

    pub(crate) fn refresh_categories(&mut self, state: &Session) {
        self.categories = state
            .categories()
            .iter()
            .map(|name| {
                let used = state.transactions().iter().filter(|t| t.category == *name);
                let (count, total) = used.fold((0, Decimal::ZERO), |(n, sum), t| {
                    (n + 1, sum.saturating_add(t.amount))
                });
                CategoryRow {
                    name: name.clone(),
                    count,
                    total,
                }
            })
            .collect();
        if self.category_index >= self.categories.len() {
            self.category_index = self.categories.len().saturating_sub(1);
        }
        if let Some(filter) = &self.category_filter {
            if !state.categories().contains(filter) {
                self.category_filter = None;
            }
        }
    }

    pub(crate) fn refresh_settings(&mut self, state: &Session) {
        self.settings = state.settings().clone();
        self.budget_cap = state.budget_cap();
    }

    pub(crate) fn refresh_all(&mut self, state: &Session) {
        self.refresh_categories(state);
        self.refresh_transactions(state);
        self.refresh_dashboard(state);
        self.refresh_settings(state);
    }

    /// Recompile the search pattern from the current input and flags.
    pub(crate) fn recompile_query(&mut self) {
        self.query = Query::compile(&self.search_input, self.case_sensitive);
        self.search_edited_at = None;
        debug!(pattern = %self.search_input, case_sensitive = self.case_sensitive, "search recompiled");
    }

    /// Note a keystroke in the search box; the query is rebuilt once the
    /// input has been quiet for the debounce period.
    pub(crate) fn search_edited(&mut self, now: Instant) {
        self.search_edited_at = Some(now);
    }

    pub(crate) fn search_due(&self, now: Instant) -> bool {
        self.search_edited_at
            .is_some_and(|at| now.duration_since(at) >= SEARCH_DEBOUNCE)
    }

    pub(crate) fn search_pending(&self) -> bool {
        self.search_edited_at.is_some()
    }

    /// First call arms `action`; a second call with the same action inside
    /// the timeout returns it for execution. A different action re-arms.
    pub(crate) fn confirm(&mut self, action: PendingAction, now: Instant) -> Option<PendingAction> {
        match self.armed.take() {
            Some(armed) if armed.action == action && now.duration_since(armed.at) < CONFIRM_TIMEOUT => {
                Some(action)
            }
            _ => {
                self.set_status(action.prompt());
                self.armed = Some(Armed { action, at: now });
                None
            }
        }
    }

    /// Drop an armed action once it has timed out. Returns true if it did.
    pub(crate) fn expire_confirm(&mut self, now: Instant) -> bool {
        match &self.armed {
            Some(armed) if now.duration_since(armed.at) >= CONFIRM_TIMEOUT => {
                self.armed = None;
                self.status_message.clear();
                true
            }
            _ => false,
        }
    }

    pub(crate) fn disarm(&mut self) {
        self.armed = None;
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub(crate) fn selected_transaction(&self) -> Option<&Transaction> {
        self.transactions.get(self.transaction_index)
    }

    pub(crate) fn selected_category(&self) -> Option<&CategoryRow> {
        self.categories.get(self.category_index)
    }

    pub(crate) fn category_names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }

    /// Step the category filter: all → each category → all.
    pub(crate) fn cycle_category_filter(&mut self) {
        let names = self.category_names();
        self.category_filter = match &self.category_filter {
            None => names.first().cloned(),
            Some(current) => names
                .iter()
                .position(|n| n == current)
                .and_then(|i| names.get(i + 1))
                .cloned(),
        };
    }

    pub(crate) fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
