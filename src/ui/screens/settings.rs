use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::models::Currency;
use crate::ui::app::App;
use crate::ui::theme;
use crate::ui::util::format_amount;

pub(crate) fn render(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(4)])
        .split(area);

    render_currencies(f, chunks[0], app);
    render_budget_and_data(f, chunks[1], app);
}

fn render_currencies(f: &mut Frame, area: Rect, app: &App) {
    let settings = &app.settings;
    let base = settings.base_currency;

    let header = Row::new(
        ["", "Currency", "Rate", "Total spent"]
            .iter()
            .map(|h| Cell::from(*h).style(theme::header_style())),
    );

    let rows: Vec<Row> = Currency::all()
        .iter()
        .enumerate()
        .map(|(i, &currency)| {
            let style = if i == app.settings_index {
                theme::selected_style()
            } else {
                theme::normal_style()
            };
            let marker = if currency == base { "●" } else { " " };
            let rate = settings
                .rates
                .get(currency.as_str())
                .map(|r| r.normalize().to_string())
                .unwrap_or_else(|| "—".into());
            let converted = settings
                .convert(app.stats.total_expenses, currency)
                .map(|amount| format_amount(amount, currency))
                .unwrap_or_else(|| "no rate".into());
            Row::new(vec![
                Cell::from(marker),
                Cell::from(currency.as_str()),
                Cell::from(rate),
                Cell::from(converted),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(2),
        Constraint::Length(10),
        Constraint::Length(14),
        Constraint::Min(18),
    ];

    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme::ACCENT))
            .title(Span::styled(
                format!(" Currency (base: {base}) "),
                Style::default()
                    .fg(theme::ACCENT)
                    .add_modifier(Modifier::BOLD),
            )),
    );
    f.render_widget(table, area);
}

fn render_budget_and_data(f: &mut Frame, area: Rect, app: &App) {
    let currency = app.settings.base_currency;
    let cap_line = if app.budget_cap.is_set() {
        Line::from(vec![
            Span::styled("  Monthly cap:  ", theme::dim_style()),
            Span::styled(
                format_amount(app.budget_cap.amount(), currency),
                theme::amount_style(),
            ),
        ])
    } else {
        Line::from(vec![
            Span::styled("  Monthly cap:  ", theme::dim_style()),
            Span::styled("not set", theme::dim_style()),
        ])
    };

    let lines = vec![
        cap_line,
        Line::from(""),
        Line::from(Span::styled(
            "  :budget <amount>      set the cap (0 clears it)",
            theme::dim_style(),
        )),
        Line::from(Span::styled(
            "  :rate <code> <rate>   units of <code> per 1 base unit",
            theme::dim_style(),
        )),
        Line::from(Span::styled(
            "  :export <path>  :export-csv <path>  :import <path>  :clear",
            theme::dim_style(),
        )),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::OVERLAY))
        .title(Span::styled(" Budget & Data ", theme::title_style()));
    f.render_widget(Paragraph::new(lines).block(block), area);
}
