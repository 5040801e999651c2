use std::io;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{debug, info};

use crate::models::Currency;
use crate::state::Session;
use crate::ui::app::{App, InputMode, Screen};
use crate::ui::commands;
use crate::ui::util::{scroll_down, scroll_to_bottom, scroll_to_top, scroll_up};
use crate::validate::Field;

const TICK: Duration = Duration::from_millis(50);

pub(crate) fn as_tui(state: &mut Session) -> Result<()> {
    let mut app = App::new();
    app.refresh_all(state);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    info!("terminal session started");

    let result = run_app(&mut terminal, &mut app, state);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    info!("terminal session ended");

    if let Err(ref e) = result {
        eprintln!("Error: {e:?}");
    }

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    state: &mut Session,
) -> Result<()> {
    while app.running {
        terminal.draw(|f| {
            // tab bar, status bar, command bar, table borders and header
            let content_height = f.area().height.saturating_sub(6) as usize;
            app.visible_rows = content_height.max(1);
            crate::ui::render::render(f, app);
        })?;

        let now = Instant::now();
        if app.search_due(now) {
            app.recompile_query();
            app.transaction_index = 0;
            app.transaction_scroll = 0;
            app.refresh_transactions(state);
        }
        app.expire_confirm(now);

        if !event::poll(TICK)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if app.show_help {
            app.show_help = false;
            continue;
        }
        match app.input_mode {
            InputMode::Normal => handle_normal_input(key, app, state)?,
            InputMode::Command => handle_command_input(key, app, state)?,
            InputMode::Search => handle_search_input(key, app, state),
            InputMode::Form => handle_form_input(key, app, state),
        }
    }
    Ok(())
}

// ── Input handlers ───────────────────────────────────────────

fn handle_normal_input(key: KeyEvent, app: &mut App, state: &mut Session) -> Result<()> {
    // Only a repeat of `D` or `:clear` may confirm an armed action.
    if !matches!(key.code, KeyCode::Char('D') | KeyCode::Char(':')) {
        app.disarm();
    }

    match key.code {
        KeyCode::Char(':') => {
            app.input_mode = InputMode::Command;
            app.command_input.clear();
        }
        KeyCode::Char('/') => {
            app.input_mode = InputMode::Search;
            app.screen = Screen::Transactions;
        }
        KeyCode::Char('q') | KeyCode::Char('c')
            if key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            app.running = false;
        }
        KeyCode::Char('q') => app.running = false,
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            for _ in 0..app.visible_rows / 2 {
                handle_move_down(app);
            }
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            for _ in 0..app.visible_rows / 2 {
                handle_move_up(app);
            }
        }
        KeyCode::Char('j') | KeyCode::Down => handle_move_down(app),
        KeyCode::Char('k') | KeyCode::Up => handle_move_up(app),
        KeyCode::Char('g') => handle_goto_top(app),
        KeyCode::Char('G') => handle_goto_bottom(app),
        KeyCode::Char('1') => switch_screen(app, state, Screen::Dashboard),
        KeyCode::Char('2') => switch_screen(app, state, Screen::Transactions),
        KeyCode::Char('3') => switch_screen(app, state, Screen::Categories),
        KeyCode::Char('4') => switch_screen(app, state, Screen::Settings),
        KeyCode::Tab => {
            let screens = Screen::all();
            let idx = screens.iter().position(|s| *s == app.screen).unwrap_or(0);
            switch_screen(app, state, screens[(idx + 1) % screens.len()]);
        }
        KeyCode::BackTab => {
            let screens = Screen::all();
            let idx = screens.iter().position(|s| *s == app.screen).unwrap_or(0);
            let prev = if idx == 0 { screens.len() - 1 } else { idx - 1 };
            switch_screen(app, state, screens[prev]);
        }
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Char('a') => commands::cmd_add("", app, state)?,
        KeyCode::Char('e') => commands::cmd_edit("", app, state)?,
        KeyCode::Char('D') => match app.screen {
            Screen::Transactions => commands::cmd_delete("", app, state)?,
            Screen::Categories => commands::cmd_delete_category("", app, state)?,
            _ => {}
        },
        KeyCode::Char('f') => {
            app.cycle_category_filter();
            app.transaction_index = 0;
            app.transaction_scroll = 0;
            app.refresh_transactions(state);
            let label = app.category_filter.as_deref().unwrap_or("all categories");
            app.set_status(format!("Showing {label}"));
        }
        KeyCode::Char('s') => {
            app.sort = app.sort.next();
            app.refresh_transactions(state);
            app.set_status(format!("Sorted by {}", app.sort));
        }
        KeyCode::Char('i') => commands::cmd_case("", app, state)?,
        KeyCode::Enter if app.screen == Screen::Settings => {
            if let Some(&currency) = Currency::all().get(app.settings_index) {
                commands::handle_command(&format!("currency {}", currency.as_str()), app, state)?;
            }
        }
        KeyCode::Esc => {
            if !app.search_input.is_empty() {
                app.search_input.clear();
                app.recompile_query();
                app.refresh_transactions(state);
                app.set_status("Search cleared");
            } else {
                app.status_message.clear();
            }
        }
        _ => {}
    }
    Ok(())
}

fn handle_command_input(key: KeyEvent, app: &mut App, state: &mut Session) -> Result<()> {
    match key.code {
        KeyCode::Enter => {
            let input = std::mem::take(&mut app.command_input);
            app.input_mode = InputMode::Normal;
            debug!(command = %input, "command entered");
            commands::handle_command(&input, app, state)?;
        }
        KeyCode::Esc => {
            app.command_input.clear();
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Backspace => {
            if app.command_input.pop().is_none() {
                app.input_mode = InputMode::Normal;
            }
        }
        KeyCode::Char(c) => app.command_input.push(c),
        _ => {}
    }
    Ok(())
}

fn handle_search_input(key: KeyEvent, app: &mut App, state: &mut Session) {
    match key.code {
        KeyCode::Enter => {
            app.input_mode = InputMode::Normal;
            if app.search_pending() {
                app.recompile_query();
                app.transaction_index = 0;
                app.transaction_scroll = 0;
                app.refresh_transactions(state);
            }
        }
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            app.search_input.clear();
            app.recompile_query();
            app.refresh_transactions(state);
        }
        KeyCode::Backspace => {
            app.search_input.pop();
            app.search_edited(Instant::now());
        }
        KeyCode::Char(c) => {
            app.search_input.push(c);
            app.search_edited(Instant::now());
        }
        _ => {}
    }
}

fn handle_form_input(key: KeyEvent, app: &mut App, state: &mut Session) {
    match key.code {
        KeyCode::Esc => {
            app.form = None;
            app.input_mode = InputMode::Normal;
            app.set_status("Cancelled");
            return;
        }
        KeyCode::Enter => {
            commands::submit_form(app, state);
            return;
        }
        _ => {}
    }

    let names = app.category_names();
    let Some(form) = app.form.as_mut() else {
        app.input_mode = InputMode::Normal;
        return;
    };
    let field = form.focused();
    match key.code {
        KeyCode::Tab => form.next_field(),
        KeyCode::BackTab => form.prev_field(),
        KeyCode::Up if field == Field::Category => form.cycle_category(&names, -1),
        KeyCode::Down if field == Field::Category => form.cycle_category(&names, 1),
        KeyCode::Up => form.prev_field(),
        KeyCode::Down => form.next_field(),
        KeyCode::Backspace => {
            form.value_mut(field).pop();
        }
        KeyCode::Char(c) => form.value_mut(field).push(c),
        _ => {}
    }
}

// ── Navigation ───────────────────────────────────────────────

fn switch_screen(app: &mut App, state: &Session, screen: Screen) {
    app.screen = screen;
    match screen {
        Screen::Dashboard => app.refresh_dashboard(state),
        Screen::Transactions => app.refresh_transactions(state),
        Screen::Categories => app.refresh_categories(state),
        Screen::Settings => app.refresh_settings(state),
    }
}

fn handle_move_down(app: &mut App) {
    let page = app.visible_rows;
    match app.screen {
        Screen::Transactions => scroll_down(
            &mut app.transaction_index,
            &mut app.transaction_scroll,
            app.transactions.len(),
            page,
        ),
        Screen::Categories => {
            if app.category_index + 1 < app.categories.len() {
                app.category_index += 1;
            }
        }
        Screen::Settings => {
            if app.settings_index + 1 < Currency::all().len() {
                app.settings_index += 1;
            }
        }
        Screen::Dashboard => {}
    }
}

fn handle_move_up(app: &mut App) {
    match app.screen {
        Screen::Transactions => scroll_up(&mut app.transaction_index, &mut app.transaction_scroll),
        Screen::Categories => app.category_index = app.category_index.saturating_sub(1),
        Screen::Settings => app.settings_index = app.settings_index.saturating_sub(1),
        Screen::Dashboard => {}
    }
}

fn handle_goto_top(app: &mut App) {
    match app.screen {
        Screen::Transactions => {
            scroll_to_top(&mut app.transaction_index, &mut app.transaction_scroll)
        }
        Screen::Categories => app.category_index = 0,
        Screen::Settings => app.settings_index = 0,
        Screen::Dashboard => {}
    }
}

fn handle_goto_bottom(app: &mut App) {
    let page = app.visible_rows;
    match app.screen {
        Screen::Transactions => scroll_to_bottom(
            &mut app.transaction_index,
            &mut app.transaction_scroll,
            app.transactions.len(),
            page,
        ),
        Screen::Categories => app.category_index = app.categories.len().saturating_sub(1),
        Screen::Settings => app.settings_index = Currency::all().len().saturating_sub(1),
        Screen::Dashboard => {}
    }
}
