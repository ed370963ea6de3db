use crate::{
    client::AppSnapshot,
    maze::Tile,
};
use cheddar_maze::{
    container::AuthButton,
    engine::{Direction, TouchDrag},
};
use color_eyre::eyre::{Result, eyre};
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEventKind, MouseButton, MouseEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{prelude::*, widgets::*};
use std::io::stdout;

pub type InputEventReceiver = EventStream;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    Move(Direction),
    Drag(TouchDrag),
    Start,
    PowerUp,
    Buy,
    Rules,
    Login,
    LogOut,
    CloseOverlays,
    SelectProfile(usize),
    Redraw,
}

#[derive(Debug, Default)]
pub struct UiState {
    mode: Mode,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
    overlays_open: bool,
    profile_count: usize,
    drag_origin: Option<(u16, u16)>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    ProfilePicker {
        idx: usize,
    },
    QuitModal,
}

impl UiState {
    pub fn open_profile_picker(&mut self) {
        self.mode = Mode::ProfilePicker { idx: 0 };
    }

    pub fn picker_open(&self) -> bool {
        matches!(self.mode, Mode::ProfilePicker { .. })
    }
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::event::DisableMouseCapture,
        crossterm::terminal::LeaveAlternateScreen
    )?;
    Ok(())
}

pub fn input_event_stream() -> InputEventReceiver {
    EventStream::new()
}

pub async fn next_raw_event(events: &mut InputEventReceiver) -> Result<Event> {
    match events.next().await {
        Some(event) => Ok(event?),
        None => Err(eyre!("terminal input stream closed")),
    }
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    // cached for input handling between frames
    state.overlays_open = snap.view.rules_open
        || snap.view.buy_panel_open
        || snap.view.not_allowed_reasons.is_some();
    state.profile_count = snap.profiles.len();
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    match event {
        Event::Key(k) if k.kind == KeyEventKind::Press => interpret_key(state, k.code),
        Event::Mouse(m) => match m.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                state.drag_origin = Some((m.column, m.row));
                None
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let (ox, oy) = state.drag_origin?;
                // board cells are two columns wide
                let dx = (i32::from(m.column) - i32::from(ox)) / 2;
                let dy = i32::from(m.row) - i32::from(oy);
                if dx == 0 && dy == 0 {
                    return None;
                }
                state.drag_origin = Some((m.column, m.row));
                Some(UserEvent::Drag(TouchDrag::new(dx, dy)))
            }
            MouseEventKind::Up(_) => {
                state.drag_origin = None;
                None
            }
            _ => None,
        },
        Event::Resize(_, _) => Some(UserEvent::Redraw),
        _ => None,
    }
}

fn interpret_key(state: &mut UiState, code: KeyCode) -> Option<UserEvent> {
    match &mut state.mode {
        Mode::QuitModal => match code {
            KeyCode::Char('y') | KeyCode::Enter => Some(UserEvent::Quit),
            KeyCode::Char('n') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::ProfilePicker { idx } => match code {
            KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Up | KeyCode::Char('k') => {
                *idx = idx.saturating_sub(1);
                Some(UserEvent::Redraw)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if *idx + 1 < state.profile_count {
                    *idx += 1;
                }
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => {
                if state.profile_count == 0 {
                    return None;
                }
                let selected = *idx;
                state.mode = Mode::Normal;
                Some(UserEvent::SelectProfile(selected))
            }
            _ => None,
        },
        Mode::Normal => match code {
            KeyCode::Up | KeyCode::Char('k') => Some(UserEvent::Move(Direction::Up)),
            KeyCode::Down | KeyCode::Char('j') => Some(UserEvent::Move(Direction::Down)),
            KeyCode::Left | KeyCode::Char('h') => Some(UserEvent::Move(Direction::Left)),
            KeyCode::Right | KeyCode::Char('l') => {
                Some(UserEvent::Move(Direction::Right))
            }
            KeyCode::Char('s') => Some(UserEvent::Start),
            KeyCode::Char('p') => Some(UserEvent::PowerUp),
            KeyCode::Char('b') => Some(UserEvent::Buy),
            KeyCode::Char('r') => Some(UserEvent::Rules),
            KeyCode::Char('i') => Some(UserEvent::Login),
            KeyCode::Char('o') => Some(UserEvent::LogOut),
            KeyCode::Char('q') => Some(UserEvent::Quit),
            KeyCode::Esc if state.overlays_open => Some(UserEvent::CloseOverlays),
            KeyCode::Esc => {
                state.mode = Mode::QuitModal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
    }
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::vertical([
        Constraint::Length(3), // account
        Constraint::Length(4), // score, clock, power-up
        Constraint::Min(10),   // board
        Constraint::Length(5), // status/errors
        Constraint::Length(3), // help
    ])
    .split(f.area());

    draw_account(f, chunks[0], snap);
    draw_stats(f, chunks[1], snap);
    draw_board(f, chunks[2], snap);
    draw_status(f, chunks[3], snap);
    draw_help(f, chunks[4], snap);
    draw_overlays(f, snap);
    draw_modals(f, state, snap);
}

fn draw_account(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let view = &snap.view;
    let account = view.account_id.as_deref().unwrap_or("not signed in");
    let button = match view.auth_button {
        AuthButton::Login => "[i] Login",
        AuthButton::LogOut => "[o] Log out",
    };
    let mut spans = vec![
        Span::raw(format!("Account: {account}  ")),
        Span::styled(button, Style::default().add_modifier(Modifier::BOLD)),
    ];
    if let Some(warning) = &view.balance_warning {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(warning.clone(), Style::default().fg(Color::Yellow)));
    }
    let widget = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title(view.title));
    f.render_widget(widget, area);
}

fn draw_stats(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let view = &snap.view;
    let power_up = if !view.power_up_enabled {
        "Power-up: none".to_string()
    } else if view.power_up_on {
        "Power-up: ON (x2)".to_string()
    } else {
        "Power-up: off".to_string()
    };
    let mut first = vec![
        Span::raw(format!("{} | {} | {power_up}", view.score_label, view.time_label)),
    ];
    if view.buy_button_visible {
        first.push(Span::raw(" | [b] Buy power-up"));
    }
    let second = if view.awaiting_eligibility {
        Line::styled("Checking eligibility...", Style::default().fg(Color::Yellow))
    } else if let Some(label) = view.start_button {
        Line::from(format!("[s] {label}"))
    } else {
        Line::from("")
    };
    let widget = Paragraph::new(vec![Line::from(first), second])
        .block(Block::default().borders(Borders::ALL).title("Game"));
    f.render_widget(widget, area);
}

fn draw_board(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let view = &snap.view;
    let mut title = String::from("Maze");
    if !view.game_over_message.is_empty() {
        title = format!("Maze | {}", view.game_over_message);
    }
    let block = Block::default().borders(Borders::ALL).title(title);
    if !view.board_visible {
        let widget = Paragraph::new("Board hidden")
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(widget, area);
        return;
    }
    let lines: Vec<Line> = snap
        .maze
        .rows()
        .enumerate()
        .map(|(y, row)| {
            let spans: Vec<Span> = row
                .iter()
                .enumerate()
                .map(|(x, tile)| {
                    if (x, y) == snap.player {
                        return Span::styled("@@", Style::default().fg(Color::LightGreen));
                    }
                    tile_span(*tile)
                })
                .collect();
            Line::from(spans)
        })
        .collect();
    let widget = Paragraph::new(lines).block(block);
    f.render_widget(widget, area);
}

fn tile_span(tile: Tile) -> Span<'static> {
    match tile {
        Tile::Wall => Span::styled("██", Style::default().fg(Color::DarkGray)),
        Tile::Floor => Span::raw("  "),
        Tile::Cheese => Span::styled("<>", Style::default().fg(Color::Yellow)),
        Tile::Exit => Span::styled("[]", Style::default().fg(Color::Cyan)),
    }
}

fn draw_status(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let widget = if snap.errors.is_empty() {
        let text = if snap.status.trim().is_empty() {
            "Ready".to_string()
        } else {
            snap.status.clone()
        };
        Paragraph::new(text)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .style(Style::default().fg(Color::Green))
    } else {
        let lines: Vec<Line> = snap.errors.iter().map(|e| Line::from(e.clone())).collect();
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Errors"))
            .style(Style::default().fg(Color::Red))
    };
    f.render_widget(widget, area);
}

fn draw_help(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let auth = match snap.view.auth_button {
        AuthButton::Login => "i login",
        AuthButton::LogOut => "o log out",
    };
    let help = Paragraph::new(format!(
        "arrows/hjkl move | drag move | s start | p power-up | b buy | r rules | {auth} | Esc close | q quit"
    ))
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

fn draw_overlays(f: &mut Frame, snap: &AppSnapshot) {
    let view = &snap.view;
    if view.rules_open {
        popup(
            f,
            "Rules",
            vec![
                Line::from("Collect cheese and find the exit before the clock runs out."),
                Line::from("Each cheese is worth 10 points, 20 with the power-up on."),
                Line::from("Sign in and hold enough Cheddar to earn rewards."),
                Line::from(""),
                Line::from("Esc to close"),
            ],
        );
    }
    if view.buy_panel_open {
        popup(
            f,
            "Buy power-up",
            vec![
                Line::from("Power-up NFTs double every cheese you collect."),
                Line::from("Mint one from the Cheddar NFT contract with your wallet,"),
                Line::from("then sign in again to pick it up."),
                Line::from(""),
                Line::from("Esc to close"),
            ],
        );
    }
    if let Some(reasons) = &view.not_allowed_reasons {
        let mut lines = vec![Line::styled(
            "You can't play right now:",
            Style::default().add_modifier(Modifier::BOLD),
        )];
        if reasons.is_empty() {
            lines.push(Line::from("- the server did not say why"));
        }
        for reason in reasons {
            lines.push(Line::from(format!("- {reason}")));
        }
        lines.push(Line::from(""));
        lines.push(Line::from("Esc to close"));
        popup(f, "Not allowed", lines);
    }
}

fn popup(f: &mut Frame, title: &str, lines: Vec<Line>) {
    let area = centered_rect(60, 40, f.area());
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    let p = Paragraph::new(lines).wrap(Wrap { trim: false });
    f.render_widget(Clear, area);
    f.render_widget(block.clone(), area);
    f.render_widget(p, block.inner(area));
}

fn draw_modals(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    match &state.mode {
        Mode::Normal => {}
        Mode::QuitModal => {
            let area = centered_rect(30, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Quit");
            let p = Paragraph::new("Quit Cheddar Maze? y/n");
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::ProfilePicker { idx } => {
            let area = centered_rect(50, 50, f.area());
            let block = Block::default().borders(Borders::ALL).title("Sign in");
            let mut lines = Vec::new();
            if snap.profiles.is_empty() {
                lines.push(Line::from("No profiles found."));
                lines.push(Line::from(
                    "Add <name>.json with {\"account_id\": \"...\"} to the profile directory.",
                ));
            } else {
                for (i, account) in snap.profiles.iter().enumerate() {
                    let cur = if i == *idx { ">" } else { " " };
                    lines.push(Line::from(format!("{cur} {account}")));
                }
            }
            lines.push(Line::from(""));
            lines.push(Line::from("Enter=sign in  Esc=cancel"));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(Paragraph::new(lines), block.inner(area));
        }
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::vertical([
        Constraint::Percentage((100 - h_percent) / 2),
        Constraint::Percentage(h_percent),
        Constraint::Percentage((100 - h_percent) / 2),
    ])
    .split(r);

    Layout::horizontal([
        Constraint::Percentage((100 - w_percent) / 2),
        Constraint::Percentage(w_percent),
        Constraint::Percentage((100 - w_percent) / 2),
    ])
    .split(popup_layout[1])[1]
}
