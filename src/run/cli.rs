use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use rust_decimal::Decimal;

use crate::models::{Currency, TransactionInput};
use crate::search::{self, Query, SortKey, View};
use crate::state::{Session, StateError};
use crate::ui::commands::read_json;

pub(crate) fn as_cli(args: &[String], state: &mut Session) -> Result<()> {
    let rest = &args[2..];
    match args[1].as_str() {
        "add" => cli_add(rest, state),
        "edit" => cli_edit(rest, state),
        "delete" | "rm" => cli_delete(rest, state),
        "list" | "ls" => cli_list(rest, state),
        "stats" | "s" => cli_stats(state),
        "budget" => cli_budget(rest, state),
        "categories" => cli_categories(state),
        "add-category" => cli_add_category(rest, state),
        "delete-category" => cli_delete_category(rest, state),
        "currency" => cli_currency(rest, state),
        "rate" => cli_rate(rest, state),
        "export" => cli_export(rest, state),
        "export-csv" => cli_export_csv(rest, state),
        "import" => cli_import(rest, state),
        "clear" => cli_clear(rest, state),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("fintrack {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => {
            print_usage();
            anyhow::bail!("Unknown command: {other}");
        }
    }
}

fn print_usage() {
    println!("FinTrack: local personal finance tracker");
    println!();
    println!("Usage: fintrack [command]");
    println!();
    println!("Commands:");
    println!("  (none)                             Launch interactive TUI");
    println!("  add <description> <amount> <category>");
    println!("    --date <YYYY-MM-DD>              Transaction date (default: today)");
    println!("  edit <id>                          Change a transaction");
    println!("    --description, --amount, --category, --date");
    println!("  delete <id>                        Delete a transaction");
    println!("  list                               List transactions");
    println!("    --search <pattern>               Regex over description, category, amount");
    println!("    --case                           Case-sensitive search");
    println!("    --category <name>                Only this category");
    println!("    --sort <key>                     date-desc, date-asc, description-asc, description-desc,");
    println!("                                     amount-desc, amount-asc, insertion");
    println!("    --mark                           Wrap matches in <mark> tags");
    println!("  stats                              Print summary figures");
    println!("  budget [amount]                    Show or set the monthly cap (0 clears)");
    println!("  categories                         List categories");
    println!("  add-category <name>                Add a category");
    println!("  delete-category <name>             Delete a category");
    println!("  currency [code]                    Show or set the base currency");
    println!("  rate <code> <rate>                 Set a conversion rate against the base");
    println!("  export [path]                      Export everything as JSON (stdout if no path)");
    println!("  export-csv [path]                  Export transactions as CSV (stdout if no path)");
    println!("  import <path>                      Import a JSON export");
    println!("  clear --yes                        Erase all data");
    println!("  --help, -h                         Show this help");
    println!("  --version, -V                      Show version");
}

/// Value following `--name`, if present.
fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

/// Leading arguments up to the first flag.
fn positional(args: &[String]) -> Vec<&str> {
    args.iter()
        .map(String::as_str)
        .take_while(|a| !a.starts_with("--"))
        .collect()
}

/// Accept a full id or an unambiguous prefix of one.
fn resolve_id(state: &Session, prefix: &str) -> Result<String> {
    if prefix.is_empty() {
        anyhow::bail!("Missing transaction id");
    }
    let mut matches = state
        .transactions()
        .iter()
        .filter(|t| t.id.starts_with(prefix));
    match (matches.next(), matches.next()) {
        (Some(txn), None) => Ok(txn.id.clone()),
        (Some(_), Some(_)) => anyhow::bail!("Id prefix '{prefix}' matches several transactions"),
        (None, _) => anyhow::bail!("No transaction with id '{prefix}'"),
    }
}

/// The `txn_` prefix plus eight characters of the uuid.
fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

fn warn_unsaved(persisted: bool) {
    if !persisted {
        eprintln!("Warning: change kept in memory only, storage unavailable");
    }
}

/// Print field errors one per line and turn them into a failure.
fn report(err: StateError) -> anyhow::Error {
    if let StateError::Invalid(errors) = &err {
        for (field, e) in &errors.0 {
            eprintln!("  {field}: {e}");
        }
    }
    anyhow::Error::new(err)
}

// ── Transactions ─────────────────────────────────────────────

fn cli_add(args: &[String], state: &mut Session) -> Result<()> {
    let pos = positional(args);
    let [description, amount, category] = pos.as_slice() else {
        anyhow::bail!("Usage: fintrack add <description> <amount> <category> [--date YYYY-MM-DD]");
    };
    let date = flag_value(args, "--date")
        .map(str::to_string)
        .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());

    let input = TransactionInput {
        description: description.to_string(),
        amount: amount.to_string(),
        category: category.to_string(),
        date,
    };
    let done = state.add_transaction(&input).map_err(report)?;
    println!(
        "Added {} {} ({}, {})",
        short_id(&done.value.id),
        done.value.description,
        done.value.amount_text(),
        done.value.category
    );
    warn_unsaved(done.persisted);
    Ok(())
}

fn cli_edit(args: &[String], state: &mut Session) -> Result<()> {
    let prefix = positional(args).first().copied().unwrap_or_default();
    let id = resolve_id(state, prefix)?;
    let current = state
        .find(&id)
        .ok_or_else(|| anyhow::anyhow!("No transaction with id '{id}'"))?;

    let mut input = TransactionInput::from_transaction(current);
    let mut changed = false;
    for (flag, slot) in [
        ("--description", &mut input.description),
        ("--amount", &mut input.amount),
        ("--category", &mut input.category),
        ("--date", &mut input.date),
    ] {
        if let Some(value) = flag_value(args, flag) {
            *slot = value.to_string();
            changed = true;
        }
    }
    if !changed {
        anyhow::bail!("Nothing to change. Use --description, --amount, --category or --date");
    }

    let done = state.update_transaction(&id, &input).map_err(report)?;
    println!(
        "Updated {} {} ({}, {})",
        short_id(&done.value.id),
        done.value.description,
        done.value.amount_text(),
        done.value.category
    );
    warn_unsaved(done.persisted);
    Ok(())
}

fn cli_delete(args: &[String], state: &mut Session) -> Result<()> {
    let prefix = positional(args).first().copied().unwrap_or_default();
    let id = resolve_id(state, prefix)?;
    let done = state.delete_transaction(&id)?;
    println!("Deleted {} {}", short_id(&id), done.value.description);
    warn_unsaved(done.persisted);
    Ok(())
}

fn cli_list(args: &[String], state: &mut Session) -> Result<()> {
    let query = Query::compile(
        flag_value(args, "--search").unwrap_or_default(),
        has_flag(args, "--case"),
    );
    if let Some(err) = query.error() {
        anyhow::bail!("Invalid pattern: {err}");
    }
    let mark = has_flag(args, "--mark");
    let view = View {
        query,
        category: flag_value(args, "--category").map(str::to_string),
        sort: flag_value(args, "--sort").map(SortKey::parse).unwrap_or_default(),
    };

    let rows = state.view(&view);
    if rows.is_empty() {
        println!("No transactions");
        return Ok(());
    }

    let currency = state.settings().base_currency;
    println!(
        "{:<12}  {:<10}  {:<30}  {:<16}  {:>12}",
        "ID", "Date", "Description", "Category", "Amount"
    );
    println!("{}", "─".repeat(88));
    for txn in &rows {
        let (description, category) = if mark {
            (
                search::highlight(&txn.description, &view.query),
                search::highlight(&txn.category, &view.query),
            )
        } else {
            (txn.description.clone(), txn.category.clone())
        };
        println!(
            "{:<12}  {:<10}  {:<30}  {:<16}  {:>12}",
            short_id(&txn.id),
            txn.date,
            description,
            category,
            format!("{}{}", currency.symbol(), txn.amount_text())
        );
    }
    println!();
    println!(
        "{} of {} transactions, sorted by {}",
        rows.len(),
        state.transactions().len(),
        view.sort
    );
    Ok(())
}

// ── Summary ──────────────────────────────────────────────────

fn cli_stats(state: &mut Session) -> Result<()> {
    let today = chrono::Local::now().date_naive();
    let stats = state.stats(today);
    let currency = state.settings().base_currency;
    let sym = currency.symbol();

    println!("FinTrack: {today}");
    println!("{}", "─".repeat(40));
    println!("  Transactions:  {}", stats.total);
    println!("  Total spent:   {sym}{:.2}", stats.total_expenses);
    println!(
        "  Top category:  {} ({sym}{:.2})",
        stats.top_category, stats.top_category_amount
    );
    println!("  Last 7 days:   {sym}{:.2}", stats.week_total);

    if let Some(budget) = state.budget_status(today) {
        println!();
        println!(
            "Budget: {sym}{:.2} of {sym}{:.2} ({:.0}%, {})",
            budget.spent,
            budget.cap,
            budget.percent,
            budget.level.as_str()
        );
    }

    let breakdown = crate::stats::category_breakdown(state.transactions());
    if !breakdown.is_empty() {
        println!();
        println!("By Category:");
        for share in &breakdown {
            let percent = if stats.total_expenses.is_zero() {
                Decimal::ZERO
            } else {
                share.amount / stats.total_expenses * Decimal::ONE_HUNDRED
            };
            println!(
                "  {:<24} {sym}{:>10.2}  {:>5.1}%",
                share.category, share.amount, percent
            );
        }
    }

    let trend = crate::stats::monthly_trend(state.transactions());
    if !trend.is_empty() {
        println!();
        println!("Monthly Trend:");
        for month in &trend {
            let arrow = month.trend.map(|t| t.arrow()).unwrap_or(" ");
            println!("  {}  {sym}{:>10.2}  {arrow}", month.month, month.amount);
        }
    }
    Ok(())
}

fn cli_budget(args: &[String], state: &mut Session) -> Result<()> {
    let currency = state.settings().base_currency;
    match args.first() {
        Some(raw) => {
            let amount = Decimal::from_str(raw.trim_start_matches(currency.symbol()))
                .with_context(|| format!("Not an amount: {raw}"))?;
            let done = state.set_budget_cap(amount)?;
            if amount.is_zero() {
                println!("Budget cap cleared");
            } else {
                println!("Budget cap set to {}{:.2}", currency.symbol(), amount);
            }
            warn_unsaved(done.persisted);
        }
        None => match state.budget_status(chrono::Local::now().date_naive()) {
            Some(budget) => println!(
                "{sym}{:.2} spent of {sym}{:.2}, {sym}{:.2} remaining ({})",
                budget.spent,
                budget.cap,
                budget.remaining,
                budget.level.as_str(),
                sym = currency.symbol()
            ),
            None => println!("No budget cap set"),
        },
    }
    Ok(())
}

// ── Categories ───────────────────────────────────────────────

fn cli_categories(state: &mut Session) -> Result<()> {
    println!("{:<24} {:>12}", "Category", "Transactions");
    println!("{}", "─".repeat(37));
    for name in state.categories().iter() {
        let count = state
            .transactions()
            .iter()
            .filter(|t| t.category == *name)
            .count();
        println!("{name:<24} {count:>12}");
    }
    Ok(())
}

fn cli_add_category(args: &[String], state: &mut Session) -> Result<()> {
    let name = args.join(" ");
    if name.is_empty() {
        anyhow::bail!("Usage: fintrack add-category <name>");
    }
    let done = state.add_category(&name)?;
    println!("Added category {name}");
    warn_unsaved(done.persisted);
    Ok(())
}

fn cli_delete_category(args: &[String], state: &mut Session) -> Result<()> {
    let name = args.join(" ");
    if name.is_empty() {
        anyhow::bail!("Usage: fintrack delete-category <name>");
    }
    let done = state.delete_category(&name)?;
    println!("Deleted category {name}");
    if done.value > 0 {
        println!("{} transactions still carry the old label", done.value);
    }
    warn_unsaved(done.persisted);
    Ok(())
}

// ── Settings ─────────────────────────────────────────────────

fn cli_currency(args: &[String], state: &mut Session) -> Result<()> {
    match args.first() {
        Some(code) => {
            let currency = Currency::parse(code)
                .ok_or_else(|| anyhow::anyhow!("Unsupported currency: {code}"))?;
            let done = state.set_base_currency(currency);
            println!("Base currency set to {currency}");
            warn_unsaved(done.persisted);
        }
        None => {
            let settings = state.settings();
            println!("Base currency: {}", settings.base_currency);
            for currency in Currency::all() {
                match settings.rates.get(currency.as_str()) {
                    Some(rate) => println!("  {:<4} {}", currency.as_str(), rate.normalize()),
                    None => println!("  {:<4} no rate", currency.as_str()),
                }
            }
        }
    }
    Ok(())
}

fn cli_rate(args: &[String], state: &mut Session) -> Result<()> {
    let pos = positional(args);
    let [code, raw] = pos.as_slice() else {
        anyhow::bail!("Usage: fintrack rate <code> <rate>");
    };
    let currency =
        Currency::parse(code).ok_or_else(|| anyhow::anyhow!("Unsupported currency: {code}"))?;
    let rate = Decimal::from_str(raw).with_context(|| format!("Not a rate: {raw}"))?;
    let done = state.set_rate(currency, rate)?;
    println!("Rate for {currency} set to {}", rate.normalize());
    warn_unsaved(done.persisted);
    Ok(())
}

// ── Data ─────────────────────────────────────────────────────

fn cli_export(args: &[String], state: &mut Session) -> Result<()> {
    let json = state.export_json()?;
    match args.first() {
        Some(path) => {
            let path = shellexpand(path);
            std::fs::write(&path, json).with_context(|| format!("Failed to write {path}"))?;
            println!("Exported to {path}");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cli_export_csv(args: &[String], state: &mut Session) -> Result<()> {
    match args.first() {
        Some(path) => {
            let path = shellexpand(path);
            let file = std::fs::File::create(&path)
                .with_context(|| format!("Failed to create {path}"))?;
            state.write_csv(file)?;
            println!(
                "Exported {} transactions to {path}",
                state.transactions().len()
            );
        }
        None => state.write_csv(std::io::stdout().lock())?,
    }
    Ok(())
}

fn cli_import(args: &[String], state: &mut Session) -> Result<()> {
    let Some(path) = args.first() else {
        anyhow::bail!("Usage: fintrack import <file.json>");
    };
    let path = shellexpand(path);
    let value = read_json(Path::new(&path))?;
    let done = state.import(&value)?;
    println!("{}", done.value.message());
    warn_unsaved(done.persisted);
    Ok(())
}

fn cli_clear(args: &[String], state: &mut Session) -> Result<()> {
    if !has_flag(args, "--yes") {
        anyhow::bail!("This erases every transaction and setting. Re-run with --yes to confirm");
    }
    let done = state.clear_all();
    println!("All data erased");
    warn_unsaved(done.persisted);
    Ok(())
}

pub(crate) fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        format!("{home}/{rest}")
    } else {
        path.to_string()
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
