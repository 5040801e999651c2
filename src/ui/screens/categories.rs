use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Cell, Row, Table},
    Frame,
};

use crate::ui::app::App;
use crate::ui::theme;
use crate::ui::util::{format_amount, truncate};

pub(crate) fn render(f: &mut Frame, area: Rect, app: &App) {
    let header = Row::new(
        ["Category", "Transactions", "Total"]
            .iter()
            .map(|h| Cell::from(*h).style(theme::header_style())),
    );

    let currency = app.settings.base_currency;
    let rows: Vec<Row> = app
        .categories
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let style = if i == app.category_index {
                theme::selected_style()
            } else if row.count == 0 {
                theme::dim_style()
            } else {
                theme::normal_style()
            };
            let name_style = if app.category_filter.as_deref() == Some(row.name.as_str()) {
                style.add_modifier(Modifier::BOLD)
            } else {
                style
            };
            Row::new(vec![
                Cell::from(Span::styled(truncate(&row.name, 30), name_style)),
                Cell::from(row.count.to_string()),
                Cell::from(format_amount(row.total, currency)),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Min(20),
        Constraint::Length(14),
        Constraint::Length(18),
    ];

    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme::ACCENT))
            .title(Span::styled(
                format!(" Categories ({}) ", app.categories.len()),
                Style::default()
                    .fg(theme::ACCENT)
                    .add_modifier(Modifier::BOLD),
            )),
    );
    f.render_widget(table, area);
}
