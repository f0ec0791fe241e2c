use crate::model::{AppSummary, FleetEvent};
use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
};
use std::collections::HashMap;

pub const TAB_APPS: usize = 0;
pub const TAB_LOGS: usize = 1;
pub const TAB_HELP: usize = 2;
pub const TAB_COUNT: usize = 3;

/// Everything the panel renders. Owned by the UI thread only.
#[derive(Default)]
pub struct PanelState {
    pub tab: usize,
    pub apps: Vec<AppSummary>,
    pub selected: usize,
    /// Apps with an action in flight, with a label for the status column.
    pub pending: HashMap<String, &'static str>,
    pub info: String,
    pub discovery_failure: Option<String>,
    pub last_refresh: Option<String>,
    pub logs: Option<LogView>,
    pub quitting: bool,
}

pub struct LogView {
    pub name: String,
    pub text: String,
    pub scroll: u16,
}

impl PanelState {
    pub fn selected_name(&self) -> Option<&str> {
        self.apps.get(self.selected).map(|a| a.name.as_str())
    }

    pub fn select_next(&mut self) {
        if !self.apps.is_empty() {
            self.selected = (self.selected + 1).min(self.apps.len() - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn next_tab(&mut self) {
        self.tab = (self.tab + 1) % TAB_COUNT;
    }

    /// Apply one controller event.
    pub fn apply_event(&mut self, ev: FleetEvent) {
        match ev {
            FleetEvent::Catalog { apps, failure } => {
                // Keep the cursor on the same app across rediscovery when possible.
                let current = self.selected_name().map(str::to_string);
                self.apps = apps;
                self.selected = current
                    .and_then(|name| self.apps.iter().position(|a| a.name == name))
                    .unwrap_or(0)
                    .min(self.apps.len().saturating_sub(1));
                self.discovery_failure = failure;
                self.last_refresh = Some(local_clock());
            }
            FleetEvent::AppUpdated(summary) => {
                if let Some(app) = self.apps.iter_mut().find(|a| a.name == summary.name) {
                    *app = summary;
                }
            }
            FleetEvent::ActionStarted { name, label } => {
                self.info = format!("{name}: {label}…");
                self.pending.insert(name, label);
            }
            FleetEvent::ActionFinished { name } => {
                self.pending.remove(&name);
            }
            FleetEvent::Logs { name, text } => {
                self.logs = Some(LogView {
                    name,
                    text,
                    scroll: 0,
                });
                self.tab = TAB_LOGS;
            }
            FleetEvent::Info(info) => {
                self.info = info.to_message();
            }
        }
    }

    pub fn scroll_logs(&mut self, down: bool) {
        if let Some(view) = self.logs.as_mut() {
            view.scroll = if down {
                view.scroll.saturating_add(1)
            } else {
                view.scroll.saturating_sub(1)
            };
        }
    }
}

/// Wall clock as `HH:MM:SS`, local when the offset is known, else UTC.
fn local_clock() -> String {
    let now = time::OffsetDateTime::now_utc();
    let now = match time::UtcOffset::current_local_offset() {
        Ok(offset) => now.to_offset(offset),
        Err(_) => now,
    };
    format!("{:02}:{:02}:{:02}", now.hour(), now.minute(), now.second())
}

pub fn push_wrapped_status_kv(out: &mut Vec<Line<'static>>, label: &str, value: &str, width: u16) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Account for borders (2 chars on each side)
    let usable_width = width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    while !remaining.is_empty() {
        let line_width = if first {
            usable_width.saturating_sub(label_width + 1).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        };
        let take = remaining.len().min(usize::from(line_width));
        let (chunk, rest) = remaining.split_at(take);
        let text: String = chunk.iter().collect();

        if first {
            out.push(Line::from(vec![
                Span::styled(label_text.clone(), Style::default().fg(Color::Gray)),
                Span::raw(" "),
                Span::raw(text),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![Span::raw("  "), Span::raw(text)]));
        }
        remaining = rest;
    }
}
