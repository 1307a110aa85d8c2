use crate::{
    app::{App, Focus, InputMode, LoginField, LogLevel, ToastLevel},
    catalog::{GameSet, Selection},
};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Padding, Paragraph},
};
use std::{io, time::Duration};

const POLL_MS: u64 = 150;

#[derive(Clone)]
struct Theme {
    accent: Color,
    border: Color,
    text: Color,
    muted: Color,
    success: Color,
    warning: Color,
    error: Color,
    header_bg: Color,
}

impl Theme {
    fn dark() -> Self {
        Self {
            accent: Color::Rgb(150, 120, 255),
            border: Color::Rgb(65, 75, 90),
            text: Color::Rgb(220, 230, 240),
            muted: Color::Rgb(135, 145, 155),
            success: Color::Rgb(120, 220, 140),
            warning: Color::Rgb(230, 200, 120),
            error: Color::Rgb(235, 100, 95),
            header_bg: Color::Rgb(22, 28, 36),
        }
    }

    fn light() -> Self {
        Self {
            accent: Color::Rgb(90, 60, 200),
            border: Color::Rgb(150, 155, 165),
            text: Color::Rgb(30, 35, 45),
            muted: Color::Rgb(110, 115, 125),
            success: Color::Rgb(30, 140, 60),
            warning: Color::Rgb(160, 120, 20),
            error: Color::Rgb(190, 40, 40),
            header_bg: Color::Rgb(230, 232, 238),
        }
    }

    fn for_config(dark_mode: bool) -> Self {
        if dark_mode {
            Self::dark()
        } else {
            Self::light()
        }
    }

    fn block(&self, title: String) -> Block<'static> {
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(self.border))
            .title(Span::styled(
                title,
                Style::default()
                    .fg(self.accent)
                    .add_modifier(Modifier::BOLD),
            ))
    }

    fn panel(&self, title: String) -> Block<'static> {
        self.block(title).padding(Padding {
            left: 1,
            right: 1,
            top: 0,
            bottom: 0,
        })
    }
}

pub fn run(app: &mut App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop(terminal: &mut Terminal<impl Backend>, app: &mut App) -> Result<()> {
    let theme = Theme::for_config(app.config.dark_mode);
    loop {
        app.tick();
        app.poll_sync();
        terminal.draw(|frame| draw(frame, app, &theme))?;

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(POLL_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(app, key);
                }
            }
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if !app.sync.authenticated {
        handle_login_key(app, key);
        return;
    }

    if app.add.open {
        handle_add_key(app, key);
        return;
    }

    if let InputMode::EditSavedir { .. } = app.input {
        handle_savedir_key(app, key);
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Tab => app.switch_focus(),
        KeyCode::Up | KeyCode::Char('k') => app.move_cursor(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_cursor(1),
        KeyCode::PageUp => app.move_cursor(-10),
        KeyCode::PageDown => app.move_cursor(10),
        KeyCode::Char(' ') => app.toggle_current(),
        KeyCode::Enter => match app.focus {
            Focus::Available => app.queue_selected(),
            Focus::Queued => app.unqueue_selected(),
        },
        KeyCode::Char('>') => app.queue_selected(),
        KeyCode::Char('<') => app.unqueue_selected(),
        KeyCode::Char('u') => app.start_update(),
        KeyCode::Char('d') => app.start_download(),
        KeyCode::Char('r') => app.start_manifest_fetch(),
        KeyCode::Char('a') => app.open_add(),
        KeyCode::Char('s') => app.begin_edit_savedir(),
        KeyCode::Char('z') => app.toggle_compress(),
        _ => {}
    }
}

fn handle_login_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Tab | KeyCode::Up | KeyCode::Down => app.login_switch_field(),
        KeyCode::Enter => app.submit_login(),
        KeyCode::Backspace => app.login_backspace(),
        KeyCode::Char(ch) => app.login_input(ch),
        _ => {}
    }
}

fn handle_add_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_add(),
        KeyCode::Up | KeyCode::Char('k') => app.add_move_cursor(-1),
        KeyCode::Down | KeyCode::Char('j') => app.add_move_cursor(1),
        KeyCode::Char(' ') => app.toggle_add_current(),
        KeyCode::Enter => app.confirm_add(),
        _ => {}
    }
}

fn handle_savedir_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_input(),
        KeyCode::Enter => app.submit_savedir(),
        KeyCode::Backspace => app.input_backspace(),
        KeyCode::Char(ch) => app.input_char(ch),
        _ => {}
    }
}

fn draw(frame: &mut Frame, app: &App, theme: &Theme) {
    if !app.sync.authenticated {
        draw_login(frame, app, theme);
    } else {
        draw_main(frame, app, theme);
        if app.add.open {
            draw_add_overlay(frame, app, theme);
        }
    }
    draw_toast(frame, app, theme);
}

fn draw_login(frame: &mut Frame, app: &App, theme: &Theme) {
    let area = centered_rect(frame.size(), 52, 12);
    frame.render_widget(Clear, area);

    let block = theme.block("gogshelf — login".to_string());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Min(1),
        ])
        .split(inner);

    let field_style = |field: LoginField| {
        if app.login.field == Some(field) {
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.muted)
        }
    };

    let username = Line::from(vec![
        Span::styled("GOG email  ", field_style(LoginField::Username)),
        Span::styled(app.login.username.clone(), Style::default().fg(theme.text)),
    ]);
    frame.render_widget(Paragraph::new(username), rows[0]);

    let masked = "*".repeat(app.login.password.chars().count());
    let password = Line::from(vec![
        Span::styled("Password   ", field_style(LoginField::Password)),
        Span::styled(masked, Style::default().fg(theme.text)),
    ]);
    frame.render_widget(Paragraph::new(password), rows[1]);

    let status = if let Some(error) = &app.sync.error {
        Line::styled(error.clone(), Style::default().fg(theme.error))
    } else if app.sync.busy {
        Line::styled("Checking session...", Style::default().fg(theme.muted))
    } else {
        Line::styled(
            "Tab switch · Enter login · Esc quit",
            Style::default().fg(theme.muted),
        )
    };
    frame.render_widget(Paragraph::new(status), rows[2]);
}

fn draw_main(frame: &mut Frame, app: &App, theme: &Theme) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(6),
        ])
        .split(frame.size());

    draw_header(frame, rows[0], app, theme);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    draw_game_list(
        frame,
        columns[0],
        format!("Available Games ({})", app.shelf.available.len()),
        &app.shelf.available,
        Some(&app.shelf.available_selection),
        app.available_cursor,
        app.focus == Focus::Available,
        theme,
    );

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(columns[1]);
    draw_game_list(
        frame,
        right[0],
        format!("To Download ({})", app.shelf.queued.len()),
        &app.shelf.queued,
        Some(&app.shelf.queued_selection),
        app.queued_cursor,
        app.focus == Focus::Queued,
        theme,
    );
    draw_game_list(
        frame,
        right[1],
        format!("Already Downloaded ({})", app.shelf.downloaded.len()),
        &app.shelf.downloaded,
        None,
        usize::MAX,
        false,
        theme,
    );

    draw_footer(frame, rows[2], app, theme);
    draw_log(frame, rows[3], app, theme);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let status = if let Some(error) = &app.sync.error {
        Span::styled(error.clone(), Style::default().fg(theme.error))
    } else if let Some(message) = &app.sync.message {
        Span::styled(message.clone(), Style::default().fg(theme.success))
    } else {
        Span::styled("Ready", Style::default().fg(theme.muted))
    };

    let line = Line::from(vec![
        Span::styled(
            " gogshelf ",
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("{} · ", app.api.base_url()),
            Style::default().fg(theme.muted),
        ),
        status,
    ]);

    let header = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(theme.border))
            .style(Style::default().bg(theme.header_bg)),
    );
    frame.render_widget(header, area);
}

#[allow(clippy::too_many_arguments)]
fn draw_game_list(
    frame: &mut Frame,
    area: Rect,
    title: String,
    set: &GameSet,
    selection: Option<&Selection>,
    cursor: usize,
    focused: bool,
    theme: &Theme,
) {
    let items: Vec<ListItem> = set
        .ordered()
        .iter()
        .map(|game| {
            let selected = selection.is_some_and(|s| s.is_selected(&game.id));
            let marker = if selection.is_none() {
                "  "
            } else if selected {
                "▪ "
            } else {
                "  "
            };
            let style = if selected {
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD)
            } else if selection.is_none() {
                Style::default().fg(theme.muted)
            } else {
                Style::default().fg(theme.text)
            };
            ListItem::new(Line::from(vec![
                Span::raw(marker.to_string()),
                Span::styled(game.title.clone(), style),
            ]))
        })
        .collect();

    let mut block = theme.panel(title);
    if focused {
        block = block.border_style(Style::default().fg(theme.accent));
    }

    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .bg(theme.border)
            .add_modifier(Modifier::BOLD),
    );

    let mut state = ListState::default();
    if focused && !set.is_empty() {
        state.select(Some(cursor.min(set.len() - 1)));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let savedir = match &app.input {
        InputMode::EditSavedir { buffer } => Span::styled(
            format!("{buffer}_"),
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        InputMode::Normal => Span::styled(app.config.savedir.clone(), Style::default().fg(theme.text)),
    };

    let compress = if app.config.compress_downloads {
        Span::styled("[x] compress", Style::default().fg(theme.success))
    } else {
        Span::styled("[ ] compress", Style::default().fg(theme.muted))
    };

    let download = if app.sync.downloading {
        Span::styled(
            "downloading...",
            Style::default()
                .fg(theme.warning)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled("d download", Style::default().fg(theme.muted))
    };

    let line = Line::from(vec![
        Span::styled("save to ", Style::default().fg(theme.muted)),
        savedir,
        Span::raw("  "),
        compress,
        Span::raw("  "),
        download,
        Span::styled(
            "  ␣ select · ⏎ move · u update · a mark downloaded · s savedir · z compress · q quit",
            Style::default().fg(theme.muted),
        ),
    ]);

    let footer = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(theme.border)),
    );
    frame.render_widget(footer, area);
}

fn draw_log(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let stamp_format = time::macros::format_description!("[hour]:[minute]:[second]");
    let visible = area.height.saturating_sub(2) as usize;
    let start = app.log.len().saturating_sub(visible);
    let lines: Vec<Line> = app.log[start..]
        .iter()
        .map(|entry| {
            let color = match entry.level {
                LogLevel::Info => theme.muted,
                LogLevel::Warn => theme.warning,
                LogLevel::Error => theme.error,
            };
            let stamp = entry
                .at
                .format(&stamp_format)
                .unwrap_or_else(|_| String::from("--:--:--"));
            Line::from(vec![
                Span::styled(format!("{stamp} "), Style::default().fg(theme.border)),
                Span::styled(entry.message.clone(), Style::default().fg(color)),
            ])
        })
        .collect();

    let log = Paragraph::new(lines).block(theme.panel("Activity".to_string()));
    frame.render_widget(log, area);
}

fn draw_add_overlay(frame: &mut Frame, app: &App, theme: &Theme) {
    let area = centered_rect(frame.size(), 64, 20);
    frame.render_widget(Clear, area);

    let title = format!(
        "Mark games as already downloaded ({} selected)",
        app.add.selection.len()
    );
    let block = theme.block(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(inner);

    draw_game_list(
        frame,
        rows[0],
        format!("Available ({})", app.shelf.available.len()),
        &app.shelf.available,
        Some(&app.add.selection),
        app.add_cursor,
        true,
        theme,
    );

    let hint = Paragraph::new(Line::styled(
        "␣ select · ⏎ confirm · Esc cancel",
        Style::default().fg(theme.muted),
    ));
    frame.render_widget(hint, rows[1]);
}

fn draw_toast(frame: &mut Frame, app: &App, theme: &Theme) {
    let Some(toast) = &app.toast else {
        return;
    };
    let frame_area = frame.size();
    let width = (toast.message.chars().count() as u16 + 4).min(frame_area.width);
    let area = Rect {
        x: frame_area.width.saturating_sub(width + 1),
        y: frame_area.y + 1,
        width,
        height: 3,
    };
    frame.render_widget(Clear, area);

    let color = match toast.level {
        ToastLevel::Info => theme.success,
        ToastLevel::Warn => theme.warning,
        ToastLevel::Error => theme.error,
    };
    let widget = Paragraph::new(Line::styled(
        toast.message.clone(),
        Style::default().fg(color),
    ))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(color)),
    );
    frame.render_widget(widget, area);
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
