mod help;
mod state;

use crate::config::FleetConfig;
use crate::metrics::compute_totals;
use crate::model::FleetEvent;
use crate::orchestrator::{self, Fleet, PanelCommand};
use crate::text_summary::containers_label;
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
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Tabs, Wrap},
    Terminal,
};
use state::{PanelState, TAB_APPS, TAB_HELP, TAB_LOGS};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(cfg: FleetConfig) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<FleetEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<PanelCommand>();

    let fleet = Arc::new(Fleet::from_config(&cfg));

    // The panel runs on its own thread so terminal I/O never blocks the runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(event_rx, cmd_tx));

    let res =
        orchestrator::run_controller(fleet, cfg.refresh_interval, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("panel thread panicked")),
        }
    }

    res
}

/// Run the panel loop on a dedicated thread.
///
/// After `q` the panel keeps drawing until the controller has drained its
/// in-flight actions and dropped the event channel.
fn run_threaded(
    mut event_rx: UnboundedReceiver<FleetEvent>,
    cmd_tx: UnboundedSender<PanelCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut state = PanelState {
        info: "Discovering apps…".into(),
        ..Default::default()
    };

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    loop {
        let mut disconnected = false;
        loop {
            match event_rx.try_recv() {
                Ok(ev) => state.apply_event(ev),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }
        if disconnected {
            break;
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if state.quitting {
                    continue;
                }
                handle_key(&mut state, k.modifiers, k.code, &cmd_tx);
            }
        }
    }

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();
    Ok(())
}

fn handle_key(
    state: &mut PanelState,
    modifiers: KeyModifiers,
    code: KeyCode,
    cmd_tx: &UnboundedSender<PanelCommand>,
) {
    let selected = state.selected_name().map(str::to_string);
    let on_selected = |state: &mut PanelState, make: fn(String) -> PanelCommand| {
        match selected.clone() {
            Some(name) if state.pending.contains_key(&name) => {
                state.info = format!("{name}: action already in progress");
            }
            Some(name) => {
                let _ = cmd_tx.send(make(name));
            }
            None => state.info = "No app selected".into(),
        }
    };

    match (modifiers, code) {
        (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
            state.quitting = true;
            state.info = "Quitting…".into();
            let _ = cmd_tx.send(PanelCommand::Quit);
        }
        (_, KeyCode::Tab) => state.next_tab(),
        (_, KeyCode::Char('?')) => {
            state.tab = if state.tab == TAB_HELP {
                TAB_APPS
            } else {
                TAB_HELP
            };
        }
        (_, KeyCode::Down) | (_, KeyCode::Char('j')) => {
            if state.tab == TAB_LOGS {
                state.scroll_logs(true);
            } else {
                state.select_next();
            }
        }
        (_, KeyCode::Up) | (_, KeyCode::Char('k')) => {
            if state.tab == TAB_LOGS {
                state.scroll_logs(false);
            } else {
                state.select_prev();
            }
        }
        (_, KeyCode::Enter) | (_, KeyCode::Char(' ')) => {
            on_selected(state, PanelCommand::Toggle);
        }
        (_, KeyCode::Char('r')) => on_selected(state, PanelCommand::Restart),
        (_, KeyCode::Char('l')) => {
            if let Some(name) = selected.clone() {
                state.info = format!("Fetching logs for {name}…");
                let _ = cmd_tx.send(PanelCommand::Logs(name));
            }
        }
        (_, KeyCode::Char('u')) => {
            if let Some(name) = selected.clone() {
                let _ = cmd_tx.send(PanelCommand::Refresh(name));
            }
        }
        (_, KeyCode::Char('d')) => {
            state.info = "Rediscovering…".into();
            let _ = cmd_tx.send(PanelCommand::Discover);
        }
        _ => {}
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &PanelState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(4),
        ])
        .split(area);

    let totals = compute_totals(&state.apps);
    let title = format!(
        "compose-fleet  {}/{} apps on  {}/{} containers",
        totals.apps_running, totals.apps, totals.containers_running, totals.containers
    );
    let tabs = Tabs::new(vec![Line::from("Apps"), Line::from("Logs"), Line::from("Help")])
        .select(state.tab)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        TAB_APPS => draw_apps(chunks[1], f, state),
        TAB_LOGS => draw_logs(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }

    draw_status(chunks[2], f, state);
}

fn draw_apps(area: Rect, f: &mut ratatui::Frame, state: &PanelState) {
    if state.apps.is_empty() {
        let p = Paragraph::new("No compose applications found.")
            .block(Block::default().borders(Borders::ALL).title("Apps"));
        f.render_widget(p, area);
        return;
    }

    let rows = state.apps.iter().map(|app| {
        let (label, color) = match state.pending.get(&app.name) {
            Some(pending) => (pending.to_string(), Color::Yellow),
            None if app.status => ("ON".to_string(), Color::Green),
            None => ("OFF".to_string(), Color::DarkGray),
        };
        Row::new(vec![
            Cell::from(app.name.clone()),
            Cell::from(Span::styled(label, Style::default().fg(color))),
            Cell::from(containers_label(app)),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(50),
            Constraint::Length(12),
            Constraint::Min(10),
        ],
    )
    .header(
        Row::new(vec!["NAME", "STATUS", "CONTAINERS"])
            .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title("Apps"))
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
    .highlight_symbol("> ");

    let mut table_state = TableState::default().with_selected(Some(state.selected));
    f.render_stateful_widget(table, area, &mut table_state);
}

fn draw_logs(area: Rect, f: &mut ratatui::Frame, state: &PanelState) {
    let (title, text, scroll) = match state.logs.as_ref() {
        Some(view) => (
            format!("Logs: {}", view.name),
            view.text.as_str(),
            view.scroll,
        ),
        None => (
            "Logs".to_string(),
            "Select an app and press l to fetch its logs.",
            0,
        ),
    };
    let p = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title(title))
        .scroll((scroll, 0));
    f.render_widget(p, area);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &PanelState) {
    let mut lines = Vec::new();
    state::push_wrapped_status_kv(&mut lines, "Info", &state.info, area.width);
    if let Some(failure) = state.discovery_failure.as_deref() {
        lines.push(Line::from(vec![
            Span::styled("Discovery: ", Style::default().fg(Color::Red)),
            Span::raw(failure.to_string()),
        ]));
    }
    let title = match state.last_refresh.as_deref() {
        Some(at) => format!("Status (refreshed {at})"),
        None => "Status".to_string(),
    };
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AppSummary;

    fn panel_with(names: &[&str]) -> PanelState {
        let mut state = PanelState::default();
        state.apply_event(FleetEvent::Catalog {
            apps: names
                .iter()
                .map(|n| AppSummary {
                    name: n.to_string(),
                    status: false,
                    running_count: 0,
                    total_count: 0,
                })
                .collect(),
            failure: None,
        });
        state
    }

    #[test]
    fn test_keys_map_to_commands() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = panel_with(&["a", "b"]);

        handle_key(&mut state, KeyModifiers::NONE, KeyCode::Char('j'), &tx);
        handle_key(&mut state, KeyModifiers::NONE, KeyCode::Enter, &tx);
        handle_key(&mut state, KeyModifiers::NONE, KeyCode::Char('r'), &tx);
        handle_key(&mut state, KeyModifiers::NONE, KeyCode::Char('l'), &tx);
        handle_key(&mut state, KeyModifiers::NONE, KeyCode::Char('d'), &tx);

        assert_eq!(rx.try_recv().unwrap(), PanelCommand::Toggle("b".into()));
        assert_eq!(rx.try_recv().unwrap(), PanelCommand::Restart("b".into()));
        assert_eq!(rx.try_recv().unwrap(), PanelCommand::Logs("b".into()));
        assert_eq!(rx.try_recv().unwrap(), PanelCommand::Discover);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_pending_app_is_not_resubmitted() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = panel_with(&["a"]);
        state.apply_event(FleetEvent::ActionStarted {
            name: "a".into(),
            label: "toggling",
        });

        handle_key(&mut state, KeyModifiers::NONE, KeyCode::Char(' '), &tx);
        assert!(rx.try_recv().is_err());
        assert_eq!(state.info, "a: action already in progress");

        handle_key(&mut state, KeyModifiers::CONTROL, KeyCode::Char('c'), &tx);
        assert_eq!(rx.try_recv().unwrap(), PanelCommand::Quit);
        assert!(state.quitting);
    }
}
