mod help;
mod state;

use crate::cli::{build_client, build_config, build_form, Cli};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Terminal,
};
use state::UiState;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use vote_console::model::SessionEvent;
use vote_console::orchestrator::{self, UiCommand};

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let api = build_client(&cfg)?;

    // Unbounded channels avoid backpressure between the UI thread and the controller.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<SessionEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_args = args.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_args, event_rx, cmd_tx));

    let res = orchestrator::run_controller(&cfg, api, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    args: Cli,
    mut event_rx: UnboundedReceiver<SessionEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut state = UiState::new(args.base_url.clone(), args.votes.clone(), args.max_log_lines);

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep the UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    (_, KeyCode::Enter) => {
                        if state.affordances().submit_enabled {
                            let form = build_form(&args, &state.votes_input);
                            let _ = cmd_tx.send(UiCommand::Submit(form));
                        }
                    }
                    (_, KeyCode::Char('s')) | (_, KeyCode::Esc) => {
                        if state.affordances().stop_enabled {
                            let _ = cmd_tx.send(UiCommand::Stop);
                        } else if state.show_help {
                            state.show_help = false;
                        }
                    }
                    (_, KeyCode::Char('?')) => state.show_help = !state.show_help,
                    (_, KeyCode::Backspace) => state.pop_input(),
                    (_, KeyCode::Char(c)) => state.push_input(c),
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(area);

    draw_form(rows[0], f, state);
    if state.show_status {
        draw_gauge(rows[1], f, state);
        draw_counts(rows[2], f, state);
    }
    draw_log(rows[3], f, state);

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(" {} ", state.session.label()),
            Style::default().fg(Color::Black).bg(Color::Cyan),
        ),
        Span::raw(" "),
        Span::raw(state.info.as_str()),
        Span::styled("   ? help", Style::default().fg(Color::DarkGray)),
    ]));
    f.render_widget(footer, rows[4]);

    if state.show_help {
        let w = area.width.min(52);
        let h = area.height.min(12);
        let popup = Rect::new(
            area.x + (area.width - w) / 2,
            area.y + (area.height - h) / 2,
            w,
            h,
        );
        help::draw_help(popup, f);
    }
}

fn draw_form(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let enabled = state.affordances().submit_enabled;
    let input_style = if enabled {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let cursor = if enabled { "_" } else { "" };
    let p = Paragraph::new(Line::from(vec![
        Span::styled("Votes: ", Style::default().fg(Color::Gray)),
        Span::styled(format!("{}{}", state.votes_input, cursor), input_style),
        Span::raw("   "),
        Span::styled(
            if enabled { "[Enter] start" } else { "" },
            Style::default().fg(Color::Green),
        ),
        Span::styled(
            if state.affordances().stop_enabled {
                "[s] stop"
            } else {
                ""
            },
            Style::default().fg(Color::Red),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("vote-console  {}", state.base_url)),
    );
    f.render_widget(p, area);
}

fn draw_gauge(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let view = &state.progress.view;
    let g = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Progress"))
        .gauge_style(Style::default().fg(Color::Green).bg(Color::Black))
        .ratio((view.percent / 100.0).clamp(0.0, 1.0))
        .label(state.progress.status_text.clone());
    f.render_widget(g, area);
}

fn draw_counts(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let p = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("Votes: ", Style::default().fg(Color::Gray)),
            Span::raw(state.progress.view.stats_text.clone()),
            Span::raw(format!("  ({:.1}%)", state.progress.view.percent)),
        ]),
        Line::from(vec![
            Span::styled("Succeeded: ", Style::default().fg(Color::Gray)),
            Span::styled(
                state.progress.success_count.to_string(),
                Style::default().fg(Color::Green),
            ),
            Span::styled("   Failed: ", Style::default().fg(Color::Gray)),
            Span::styled(
                state.progress.error_count.to_string(),
                Style::default().fg(Color::Red),
            ),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}

fn draw_log(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    // Keep the newest lines in view, like an auto-scrolling log.
    let visible = area.height.saturating_sub(2) as usize;
    let skip = state.log.len().saturating_sub(visible);
    let lines: Vec<Line> = state
        .log
        .iter()
        .skip(skip)
        .map(|l| {
            let style = if l.starts_with("Error") {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            Line::from(Span::styled(l.clone(), style))
        })
        .collect();
    let p = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Log ({}/{})", state.log.len(), state.log.capacity())),
    );
    f.render_widget(p, area);
}
