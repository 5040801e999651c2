use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::ui::app::App;
use crate::ui::theme;
use crate::ui::util::{format_amount, highlight_spans, truncate};

const DESCRIPTION_WIDTH: usize = 40;

fn title(app: &App) -> String {
    let mut parts = vec![format!("Transactions ({}/{})", app.transactions.len(), app.transaction_count)];
    if !app.search_input.is_empty() {
        let case = if app.case_sensitive { "Aa" } else { "aa" };
        parts.push(format!("/{}/ {case}", app.search_input));
    }
    if let Some(category) = &app.category_filter {
        parts.push(format!("in {category}"));
    }
    parts.push(format!("sort: {}", app.sort));
    format!(" {} ", parts.join(" · "))
}

/// Highlight search hits within the visible (possibly truncated) text.
fn marked<'a>(app: &App, text: &str, max: usize, base: Style) -> Line<'a> {
    let shown = truncate(text, max);
    let ranges = app.query.match_ranges(&shown);
    Line::from(highlight_spans(&shown, &ranges, base, theme::mark_style()))
}

pub(crate) fn render(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::OVERLAY))
        .title(Span::styled(title(app), theme::title_style()));

    if app.transactions.is_empty() {
        let msg = if let Some(err) = app.query.error() {
            vec![
                Line::from(""),
                Line::from(Span::styled("Invalid search pattern", theme::error_style())),
                Line::from(Span::styled(err.to_string(), theme::dim_style())),
            ]
        } else if !app.search_input.is_empty() || app.category_filter.is_some() {
            vec![
                Line::from(""),
                Line::from(Span::styled(
                    "No transactions match the current search and filter",
                    theme::dim_style(),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    "Press Esc to clear the search, f to change the filter",
                    theme::dim_style(),
                )),
            ]
        } else {
            vec![
                Line::from(""),
                Line::from(Span::styled("No transactions yet", theme::dim_style())),
                Line::from(""),
                Line::from(Span::styled(
                    "Press a to add one, or :import a JSON export",
                    theme::dim_style(),
                )),
            ]
        };
        f.render_widget(Paragraph::new(msg).centered().block(block), area);
        return;
    }

    let header_cells = ["Date", "Description", "Category", "Amount"]
        .iter()
        .map(|h| Cell::from(*h).style(theme::header_style()));
    let header = Row::new(header_cells).height(1);

    let currency = app.settings.base_currency;
    let rows: Vec<Row> = app
        .transactions
        .iter()
        .enumerate()
        .skip(app.transaction_scroll)
        .take(area.height.saturating_sub(3) as usize)
        .map(|(i, txn)| {
            let style = if i == app.transaction_index {
                theme::selected_style()
            } else if i % 2 == 1 {
                theme::alt_row_style()
            } else {
                theme::normal_style()
            };
            let orphaned = !app.categories.iter().any(|c| c.name == txn.category);
            let category_style = if orphaned {
                style.add_modifier(Modifier::ITALIC | Modifier::DIM)
            } else {
                style
            };

            Row::new(vec![
                Cell::from(marked(app, &txn.date, 10, style)),
                Cell::from(marked(app, &txn.description, DESCRIPTION_WIDTH, style)),
                Cell::from(marked(app, &txn.category, 18, category_style)),
                Cell::from(Span::styled(
                    format_amount(txn.amount, currency),
                    if i == app.transaction_index {
                        style
                    } else {
                        theme::amount_style()
                    },
                )),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(12),
        Constraint::Min(20),
        Constraint::Length(18),
        Constraint::Length(16),
    ];

    let table = Table::new(rows, widths).header(header).block(block);
    f.render_widget(table, area);
}
