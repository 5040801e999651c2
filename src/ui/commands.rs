use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Instant;

use anyhow::Context;
use rust_decimal::Decimal;

use super::app::{App, InputMode, PendingAction, Screen, TransactionForm};
use crate::models::Currency;
use crate::run::shellexpand;
use crate::search::SortKey;
use crate::state::{Session, StateError};

pub(crate) struct Command {
    pub(crate) description: &'static str,
    pub(crate) run: fn(&str, &mut App, &mut Session) -> anyhow::Result<()>,
}

macro_rules! register_command {
    ($name:expr, $desc:expr, $func:expr, $registry:expr) => {{
        $registry.insert(
            $name,
            Command {
                description: $desc,
                run: $func,
            },
        );
    }};
}

pub(crate) static COMMANDS: LazyLock<HashMap<&str, Command>> = LazyLock::new(|| {
    let mut r: HashMap<&str, Command> = HashMap::new();

    register_command!("q", "Quit FinTrack", cmd_quit, r);
    register_command!("quit", "Quit FinTrack", cmd_quit, r);
    register_command!("d", "Go to Dashboard", cmd_dashboard, r);
    register_command!("dashboard", "Go to Dashboard", cmd_dashboard, r);
    register_command!("t", "Go to Transactions", cmd_transactions, r);
    register_command!("transactions", "Go to Transactions", cmd_transactions, r);
    register_command!("c", "Go to Categories", cmd_categories, r);
    register_command!("categories", "Go to Categories", cmd_categories, r);
    register_command!("settings", "Go to Settings", cmd_settings, r);
    register_command!("help", "Show available commands", cmd_help, r);
    register_command!("h", "Show available commands", cmd_help, r);
    register_command!("add", "Add a transaction", cmd_add, r);
    register_command!("a", "Add a transaction", cmd_add, r);
    register_command!("edit", "Edit selected transaction", cmd_edit, r);
    register_command!("e", "Edit selected transaction", cmd_edit, r);
    register_command!(
        "delete",
        "Delete selected transaction (run twice)",
        cmd_delete,
        r
    );
    register_command!(
        "search",
        "Search transactions by regex (e.g. :search ^coff)",
        cmd_search,
        r
    );
    register_command!("s", "Search transactions (e.g. :s coffee)", cmd_search, r);
    register_command!("case", "Toggle case-sensitive search", cmd_case, r);
    register_command!(
        "filter",
        "Filter by category (e.g. :filter Food, :filter to clear)",
        cmd_filter,
        r
    );
    register_command!(
        "sort",
        "Sort transactions (date-desc, date-asc, description-asc, description-desc, amount-asc, amount-desc)",
        cmd_sort,
        r
    );
    register_command!(
        "category",
        "Create category (e.g. :category Home Office)",
        cmd_category,
        r
    );
    register_command!(
        "delete-category",
        "Delete a category (e.g. :delete-category Fees, run twice)",
        cmd_delete_category,
        r
    );
    register_command!(
        "budget",
        "Set monthly budget cap (e.g. :budget 500, 0 clears)",
        cmd_budget,
        r
    );
    register_command!(
        "currency",
        "Set base currency (e.g. :currency EUR)",
        cmd_currency,
        r
    );
    register_command!(
        "rate",
        "Set conversion rate (e.g. :rate GBP 0.79)",
        cmd_rate,
        r
    );
    register_command!(
        "export",
        "Export all data as JSON (e.g. :export ~/fintrack.json)",
        cmd_export,
        r
    );
    register_command!(
        "export-csv",
        "Export transactions as CSV (e.g. :export-csv ~/fintrack.csv)",
        cmd_export_csv,
        r
    );
    register_command!(
        "import",
        "Import a JSON export (e.g. :import ~/fintrack.json)",
        cmd_import,
        r
    );
    register_command!("clear", "Erase all data (run twice)", cmd_clear, r);

    r
});

pub(crate) fn handle_command(input: &str, app: &mut App, state: &mut Session) -> anyhow::Result<()> {
    let trimmed = input.trim();
    let mut parts = trimmed.splitn(2, ' ');
    let cmd_name = parts.next().unwrap_or("");
    let args = parts.next().unwrap_or("").trim();

    if let Some(cmd) = COMMANDS.get(cmd_name) {
        (cmd.run)(args, app, state)?;
    } else {
        let suggestion = find_closest(cmd_name);
        app.set_status(format!(
            "Unknown command: :{cmd_name}. Did you mean :{suggestion}?"
        ));
    }

    Ok(())
}

fn find_closest(input: &str) -> String {
    COMMANDS
        .keys()
        .filter(|k| k.len() > 1) // skip single-letter aliases for suggestions
        .min_by_key(|k| levenshtein(input, k))
        .unwrap_or(&"help")
        .to_string()
}

fn levenshtein(a: &str, b: &str) -> usize {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Tell the user when a change only lives in memory.
fn persisted_note(persisted: bool) -> &'static str {
    if persisted {
        ""
    } else {
        " (not saved: storage unavailable)"
    }
}

// ── Navigation ───────────────────────────────────────────────

fn cmd_quit(_args: &str, app: &mut App, _state: &mut Session) -> anyhow::Result<()> {
    app.running = false;
    Ok(())
}

fn cmd_dashboard(_args: &str, app: &mut App, state: &mut Session) -> anyhow::Result<()> {
    app.screen = Screen::Dashboard;
    app.refresh_dashboard(state);
    Ok(())
}

fn cmd_transactions(_args: &str, app: &mut App, state: &mut Session) -> anyhow::Result<()> {
    app.screen = Screen::Transactions;
    app.refresh_transactions(state);
    Ok(())
}

fn cmd_categories(_args: &str, app: &mut App, state: &mut Session) -> anyhow::Result<()> {
    app.screen = Screen::Categories;
    app.refresh_categories(state);
    Ok(())
}

fn cmd_settings(_args: &str, app: &mut App, state: &mut Session) -> anyhow::Result<()> {
    app.screen = Screen::Settings;
    app.refresh_settings(state);
    Ok(())
}

fn cmd_help(_args: &str, app: &mut App, _state: &mut Session) -> anyhow::Result<()> {
    app.show_help = true;
    Ok(())
}

// ── Transactions ─────────────────────────────────────────────

pub(crate) fn cmd_add(_args: &str, app: &mut App, _state: &mut Session) -> anyhow::Result<()> {
    let default_category = app
        .category_filter
        .clone()
        .or_else(|| app.category_names().into_iter().next());
    app.form = Some(TransactionForm::new_entry(
        default_category.as_deref(),
        app.today,
    ));
    app.screen = Screen::Transactions;
    app.input_mode = InputMode::Form;
    Ok(())
}

pub(crate) fn cmd_edit(_args: &str, app: &mut App, _state: &mut Session) -> anyhow::Result<()> {
    if app.screen != Screen::Transactions {
        app.set_status("Select a transaction on the Transactions screen first");
        return Ok(());
    }
    match app.selected_transaction() {
        Some(txn) => {
            app.form = Some(TransactionForm::edit(txn));
            app.input_mode = InputMode::Form;
        }
        None => app.set_status("No transaction selected"),
    }
    Ok(())
}

pub(crate) fn cmd_delete(_args: &str, app: &mut App, state: &mut Session) -> anyhow::Result<()> {
    if app.screen != Screen::Transactions {
        app.set_status("Select a transaction on the Transactions screen first");
        return Ok(());
    }
    let Some(txn) = app.selected_transaction() else {
        app.set_status("No transaction selected");
        return Ok(());
    };
    let action = PendingAction::DeleteTransaction {
        id: txn.id.clone(),
        description: txn.description.clone(),
    };
    if let Some(action) = app.confirm(action, Instant::now()) {
        run_pending(action, app, state);
    }
    Ok(())
}

fn cmd_search(args: &str, app: &mut App, state: &mut Session) -> anyhow::Result<()> {
    app.search_input = args.to_string();
    app.recompile_query();
    app.screen = Screen::Transactions;
    app.transaction_index = 0;
    app.transaction_scroll = 0;
    app.refresh_transactions(state);
    match app.query.error() {
        Some(err) => app.set_status(format!("Invalid pattern: {err}")),
        None => app.set_status(format!("{} matches", app.transactions.len())),
    }
    Ok(())
}

pub(crate) fn cmd_case(_args: &str, app: &mut App, state: &mut Session) -> anyhow::Result<()> {
    app.case_sensitive = !app.case_sensitive;
    app.recompile_query();
    app.refresh_transactions(state);
    app.set_status(if app.case_sensitive {
        "Case-sensitive search"
    } else {
        "Case-insensitive search"
    });
    Ok(())
}

fn cmd_filter(args: &str, app: &mut App, state: &mut Session) -> anyhow::Result<()> {
    if args.is_empty() || args.eq_ignore_ascii_case("all") {
        app.category_filter = None;
        app.set_status("Showing all categories");
    } else if state.categories().contains(args) {
        app.category_filter = Some(args.to_string());
        app.set_status(format!("Filtering by {args}"));
    } else {
        app.set_status(format!("Unknown category: {args}"));
        return Ok(());
    }
    app.screen = Screen::Transactions;
    app.transaction_index = 0;
    app.transaction_scroll = 0;
    app.refresh_transactions(state);
    Ok(())
}

fn cmd_sort(args: &str, app: &mut App, state: &mut Session) -> anyhow::Result<()> {
    app.sort = if args.is_empty() {
        app.sort.next()
    } else {
        SortKey::parse(args)
    };
    app.refresh_transactions(state);
    app.set_status(format!("Sorted by {}", app.sort));
    Ok(())
}

// ── Categories ───────────────────────────────────────────────

fn cmd_category(args: &str, app: &mut App, state: &mut Session) -> anyhow::Result<()> {
    if args.is_empty() {
        app.set_status("Usage: :category <name>");
        return Ok(());
    }
    match state.add_category(args) {
        Ok(done) => {
            app.refresh_categories(state);
            app.set_status(format!(
                "Created category: {args}{}",
                persisted_note(done.persisted)
            ));
        }
        Err(e) => app.set_status(e.to_string()),
    }
    Ok(())
}

pub(crate) fn cmd_delete_category(
    args: &str,
    app: &mut App,
    state: &mut Session,
) -> anyhow::Result<()> {
    let name = if args.is_empty() {
        match (app.screen, app.selected_category()) {
            (Screen::Categories, Some(row)) => row.name.clone(),
            _ => {
                app.set_status("Usage: :delete-category <name>");
                return Ok(());
            }
        }
    } else {
        args.to_string()
    };
    if !state.categories().contains(&name) {
        app.set_status(format!("Unknown category: {name}"));
        return Ok(());
    }
    if let Some(action) = app.confirm(PendingAction::DeleteCategory { name }, Instant::now()) {
        run_pending(action, app, state);
    }
    Ok(())
}

// ── Settings ─────────────────────────────────────────────────

fn cmd_budget(args: &str, app: &mut App, state: &mut Session) -> anyhow::Result<()> {
    let Ok(amount) = Decimal::from_str(args) else {
        app.set_status("Usage: :budget <amount> (0 clears the cap)");
        return Ok(());
    };
    match state.set_budget_cap(amount) {
        Ok(done) => {
            app.refresh_dashboard(state);
            app.refresh_settings(state);
            let msg = if amount.is_zero() {
                "Budget cap cleared".to_string()
            } else {
                format!("Budget cap set to {amount:.2}")
            };
            app.set_status(format!("{msg}{}", persisted_note(done.persisted)));
        }
        Err(e) => app.set_status(e.to_string()),
    }
    Ok(())
}

fn cmd_currency(args: &str, app: &mut App, state: &mut Session) -> anyhow::Result<()> {
    let Some(currency) = Currency::parse(args) else {
        let codes: Vec<&str> = Currency::all().iter().map(|c| c.as_str()).collect();
        app.set_status(format!("Usage: :currency <code>. Codes: {}", codes.join(", ")));
        return Ok(());
    };
    let done = state.set_base_currency(currency);
    app.refresh_settings(state);
    app.set_status(format!(
        "Base currency: {currency}{}",
        persisted_note(done.persisted)
    ));
    Ok(())
}

fn cmd_rate(args: &str, app: &mut App, state: &mut Session) -> anyhow::Result<()> {
    let mut parts = args.split_whitespace();
    let currency = parts.next().and_then(Currency::parse);
    let rate = parts.next().and_then(|r| Decimal::from_str(r).ok());
    let (Some(currency), Some(rate)) = (currency, rate) else {
        app.set_status("Usage: :rate <code> <rate>");
        return Ok(());
    };
    match state.set_rate(currency, rate) {
        Ok(done) => {
            app.refresh_settings(state);
            app.set_status(format!(
                "1 {} = {rate} {currency}{}",
                state.settings().base_currency,
                persisted_note(done.persisted)
            ));
        }
        Err(e) => app.set_status(e.to_string()),
    }
    Ok(())
}

// ── Data ─────────────────────────────────────────────────────

fn cmd_export(args: &str, app: &mut App, state: &mut Session) -> anyhow::Result<()> {
    if args.is_empty() {
        app.set_status("Usage: :export <path>");
        return Ok(());
    }
    let path = shellexpand(args);
    let result = state
        .export_json()
        .and_then(|json| std::fs::write(&path, json).with_context(|| format!("Failed to write {path}")));
    match result {
        Ok(()) => app.set_status(format!("Exported to {path}")),
        Err(e) => app.set_status(format!("Export failed: {e:#}")),
    }
    Ok(())
}

fn cmd_export_csv(args: &str, app: &mut App, state: &mut Session) -> anyhow::Result<()> {
    if args.is_empty() {
        app.set_status("Usage: :export-csv <path>");
        return Ok(());
    }
    let path = shellexpand(args);
    let result = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create {path}"))
        .and_then(|file| state.write_csv(file));
    match result {
        Ok(()) => app.set_status(format!(
            "Exported {} transactions to {path}",
            state.transactions().len()
        )),
        Err(e) => app.set_status(format!("Export failed: {e:#}")),
    }
    Ok(())
}

fn cmd_import(args: &str, app: &mut App, state: &mut Session) -> anyhow::Result<()> {
    if args.is_empty() {
        app.set_status("Usage: :import <path>");
        return Ok(());
    }
    let path = shellexpand(args);
    let value = match read_json(Path::new(&path)) {
        Ok(value) => value,
        Err(e) => {
            app.set_status(format!("Import failed: {e:#}"));
            return Ok(());
        }
    };
    match state.import(&value) {
        Ok(done) => {
            app.refresh_all(state);
            app.set_status(format!(
                "{}{}",
                done.value.message(),
                persisted_note(done.persisted)
            ));
        }
        Err(e) => app.set_status(format!("Import failed: {e}")),
    }
    Ok(())
}

pub(crate) fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn cmd_clear(_args: &str, app: &mut App, state: &mut Session) -> anyhow::Result<()> {
    if let Some(action) = app.confirm(PendingAction::ClearAll, Instant::now()) {
        run_pending(action, app, state);
    }
    Ok(())
}

/// Save the open form. On failure the form stays open with the reasons
/// attached to their fields.
pub(crate) fn submit_form(app: &mut App, state: &mut Session) {
    let Some(mut form) = app.form.take() else {
        return;
    };
    let result = match &form.editing {
        Some(id) => state.update_transaction(id, &form.input),
        None => state.add_transaction(&form.input),
    };
    match result {
        Ok(done) => {
            let verb = if form.editing.is_some() { "Updated" } else { "Added" };
            app.input_mode = InputMode::Normal;
            app.refresh_all(state);
            if let Some(pos) = app.transactions.iter().position(|t| t.id == done.value.id) {
                app.transaction_index = pos;
            }
            app.set_status(format!(
                "{verb}: {} ({}){}",
                done.value.description,
                done.value.amount_text(),
                persisted_note(done.persisted)
            ));
        }
        Err(StateError::Invalid(errors)) => {
            form.message = None;
            form.errors = errors;
            app.form = Some(form);
        }
        Err(e) => {
            form.errors = Default::default();
            form.message = Some(e.to_string());
            app.form = Some(form);
        }
    }
}

/// Carry out a confirmed destructive action.
pub(crate) fn run_pending(action: PendingAction, app: &mut App, state: &mut Session) {
    match action {
        PendingAction::DeleteTransaction { id, description } => {
            match state.delete_transaction(&id) {
                Ok(done) => app.set_status(format!(
                    "Deleted: {description}{}",
                    persisted_note(done.persisted)
                )),
                Err(e) => app.set_status(e.to_string()),
            }
        }
        PendingAction::DeleteCategory { name } => match state.delete_category(&name) {
            Ok(done) => {
                let orphans = match done.value {
                    0 => String::new(),
                    n => format!(" ({n} transactions keep the old label)"),
                };
                app.set_status(format!(
                    "Deleted category: {name}{orphans}{}",
                    persisted_note(done.persisted)
                ));
            }
            Err(e) => app.set_status(e.to_string()),
        },
        PendingAction::ClearAll => {
            let done = state.clear_all();
            app.category_filter = None;
            app.set_status(format!("All data erased{}", persisted_note(done.persisted)));
        }
    }
    app.refresh_all(state);
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
