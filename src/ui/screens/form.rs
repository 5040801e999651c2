use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::ui::app::TransactionForm;
use crate::ui::theme;
use crate::ui::util::centered_rect;

pub(crate) fn render(f: &mut Frame, area: Rect, form: &TransactionForm) {
    let title = if form.editing.is_some() {
        " Edit Transaction "
    } else {
        " Add Transaction "
    };

    let mut lines = vec![Line::from("")];
    for (i, field) in TransactionForm::FIELDS.iter().enumerate() {
        let focused = i == form.focus;
        let label_style = if focused {
            Style::default()
                .fg(theme::ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            theme::dim_style()
        };
        let cursor = if focused { "▏" } else { "" };
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<12}", field.to_string()), label_style),
            Span::styled(format!("{}{cursor}", form.value(*field)), theme::normal_style()),
        ]));
        match form.errors.get(*field) {
            Some(err) => lines.push(Line::from(Span::styled(
                format!("  {:<12}{err}", ""),
                theme::error_style(),
            ))),
            None => lines.push(Line::from("")),
        }
    }
    if let Some(message) = &form.message {
        lines.push(Line::from(Span::styled(format!("  {message}"), theme::error_style())));
    }

    let popup = centered_rect(area, 72, lines.len() as u16 + 2);

    f.render_widget(Clear, popup);
    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme::ACCENT))
            .title(Span::styled(
                title,
                Style::default()
                    .fg(theme::ACCENT)
                    .add_modifier(Modifier::BOLD),
            ))
            .style(Style::default().bg(theme::HEADER_BG)),
    );
    f.render_widget(widget, popup);
}
