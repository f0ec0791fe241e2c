use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const KEYBINDS: &[(&str, &str)] = &[
    ("q / Ctrl-C", "Quit (waits for running actions)"),
    ("↑/↓ or j/k", "Select app (scroll on Logs tab)"),
    ("enter / space", "Start or stop the selected app"),
    ("r", "Restart the selected app"),
    ("l", "Show recent logs of the selected app"),
    ("u", "Re-probe the selected app"),
    ("d", "Rediscover all apps"),
    ("tab", "Switch tabs"),
    ("?", "Show this help"),
];

pub fn draw_help(area: Rect, f: &mut Frame) {
    let mut lines = vec![Line::from("Keybinds:")];
    for (keys, what) in KEYBINDS {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(format!("{keys:<14}"), Style::default().fg(Color::Magenta)),
            Span::raw(*what),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(
        "Status is ON when at least one container of the app is running.",
    ));
    lines.push(Line::from(
        "Only one action per app runs at a time; other apps stay usable.",
    ));

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
