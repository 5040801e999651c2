use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Gauge, Paragraph},
    Frame,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::stats::NO_CATEGORY;
use crate::ui::app::App;
use crate::ui::theme;
use crate::ui::util::{format_amount, truncate};

const BREAKDOWN_BAR_WIDTH: usize = 20;

pub(crate) fn render(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Summary cards
            Constraint::Length(3), // Budget gauge
            Constraint::Min(8),    // Week chart + breakdown
            Constraint::Length(9), // Monthly trend
        ])
        .split(area);

    render_summary_cards(f, chunks[0], app);
    render_budget(f, chunks[1], app);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[2]);
    render_week_chart(f, middle[0], app);
    render_breakdown(f, middle[1], app);
    render_trend(f, chunks[3], app);
}

fn block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::OVERLAY))
        .title(Span::styled(format!(" {title} "), theme::title_style()))
}

fn render_summary_cards(f: &mut Frame, area: Rect, app: &App) {
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(area);

    let currency = app.settings.base_currency;
    let stats = &app.stats;

    render_card(
        f,
        cards[0],
        "Transactions",
        stats.total.to_string(),
        theme::ACCENT,
        String::new(),
    );
    render_card(
        f,
        cards[1],
        "Total Spent",
        format_amount(stats.total_expenses, currency),
        theme::PEACH,
        String::new(),
    );
    let top_sub = if stats.top_category == NO_CATEGORY {
        String::new()
    } else {
        format_amount(stats.top_category_amount, currency)
    };
    render_card(
        f,
        cards[2],
        "Top Category",
        stats.top_category.clone(),
        theme::YELLOW,
        top_sub,
    );
    render_card(
        f,
        cards[3],
        "Last 7 Days",
        format_amount(stats.week_total, currency),
        theme::GREEN,
        String::new(),
    );
}

fn render_card(f: &mut Frame, area: Rect, title: &str, value: String, color: Color, subtitle: String) {
    let text = Paragraph::new(vec![
        Line::from(Span::styled(
            value,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(subtitle, theme::dim_style())),
    ])
    .centered()
    .block(block(title));

    f.render_widget(text, area);
}

fn render_budget(f: &mut Frame, area: Rect, app: &App) {
    let Some(status) = &app.budget else {
        let msg = Paragraph::new(Line::from(Span::styled(
            "No budget cap set. Use :budget <amount>",
            theme::dim_style(),
        )))
        .centered()
        .block(block("Budget"));
        f.render_widget(msg, area);
        return;
    };

    let currency = app.settings.base_currency;
    let ratio = (status.percent / Decimal::ONE_HUNDRED)
        .to_f64()
        .unwrap_or(0.0)
        .clamp(0.0, 1.0);
    let remaining = if status.remaining < Decimal::ZERO {
        format!("{} over", format_amount(status.remaining.abs(), currency))
    } else {
        format!("{} left", format_amount(status.remaining, currency))
    };
    let label = format!(
        "{} of {} ({:.0}%) · {} · {}",
        format_amount(status.spent, currency),
        format_amount(status.cap, currency),
        status.percent,
        remaining,
        status.level.as_str(),
    );

    let gauge = Gauge::default()
        .block(block("Budget"))
        .gauge_style(
            Style::default()
                .fg(theme::budget_color(status.level))
                .bg(theme::SURFACE),
        )
        .ratio(ratio)
        .label(Span::styled(
            label,
            Style::default()
                .fg(theme::TEXT)
                .add_modifier(Modifier::BOLD),
        ));
    f.render_widget(gauge, area);
}

fn render_week_chart(f: &mut Frame, area: Rect, app: &App) {
    let bars: Vec<Bar> = app
        .stats
        .daily_totals
        .iter()
        .map(|(day, amount)| {
            Bar::default()
                .value(amount.round().to_u64().unwrap_or(0))
                .text_value(format!("{amount:.0}"))
                .label(Line::from(day.format("%a").to_string()))
                .style(Style::default().fg(theme::ACCENT))
        })
        .collect();

    let chart = BarChart::default()
        .block(block("Last 7 Days"))
        .data(BarGroup::default().bars(&bars))
        .bar_width(5)
        .bar_gap(1)
        .value_style(
            Style::default()
                .fg(theme::HEADER_BG)
                .bg(theme::ACCENT)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(chart, area);
}

fn render_breakdown(f: &mut Frame, area: Rect, app: &App) {
    if app.breakdown.is_empty() {
        let msg = Paragraph::new(Line::from(Span::styled(
            "No spending yet. Press a to add a transaction",
            theme::dim_style(),
        )))
        .centered()
        .block(block("By Category"));
        f.render_widget(msg, area);
        return;
    }

    let currency = app.settings.base_currency;
    let lines: Vec<Line> = app
        .breakdown
        .iter()
        .take(area.height.saturating_sub(2) as usize)
        .map(|share| {
            let filled = (share.ratio * Decimal::from(BREAKDOWN_BAR_WIDTH))
                .round()
                .to_usize()
                .unwrap_or(0)
                .min(BREAKDOWN_BAR_WIDTH);
            Line::from(vec![
                Span::styled(
                    format!("{:<14}", truncate(&share.category, 14)),
                    theme::normal_style(),
                ),
                Span::styled("█".repeat(filled.max(1)), Style::default().fg(theme::ACCENT)),
                Span::raw(" ".repeat(BREAKDOWN_BAR_WIDTH + 1 - filled.max(1))),
                Span::styled(format_amount(share.amount, currency), theme::amount_style()),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(block("By Category")), area);
}

fn render_trend(f: &mut Frame, area: Rect, app: &App) {
    if app.trend.is_empty() {
        let msg = Paragraph::new(Line::from(Span::styled(
            "No monthly history yet",
            theme::dim_style(),
        )))
        .centered()
        .block(block("Monthly Trend"));
        f.render_widget(msg, area);
        return;
    }

    let currency = app.settings.base_currency;
    let lines: Vec<Line> = app
        .trend
        .iter()
        .map(|month| {
            let (arrow, word) = month
                .trend
                .map(|t| (t.arrow(), t.as_str()))
                .unwrap_or((" ", ""));
            Line::from(vec![
                Span::styled(format!("  {}  ", month.month), theme::dim_style()),
                Span::styled(
                    format!("{:>16}", format_amount(month.amount, currency)),
                    theme::amount_style(),
                ),
                Span::styled(
                    format!("  {arrow} {word}"),
                    Style::default().fg(theme::trend_color(month.trend)),
                ),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(block("Monthly Trend")), area);
}
