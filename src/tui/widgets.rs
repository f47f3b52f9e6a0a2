// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn heading(text: &'static str, color: Color) -> Line<'static> {
    Line::from(Span::styled(
        text,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

pub fn get_help_lines() -> Vec<Line<'static>> {
    vec![
        Line::from(""),
        heading("tvgrid - Help", Color::Cyan),
        Line::from(""),
        heading("Navigation:", Color::Yellow),
        Line::from("  j/k       - Move the list cursor"),
        Line::from("  PgUp/PgDn - Page through the list"),
        Line::from("  Home/End  - Jump to first/last"),
        Line::from("  Enter     - Play the highlighted channel"),
        Line::from("  ↑/↓       - Previous/next channel while playing"),
        Line::from("  q         - Quit"),
        Line::from(""),
        heading("Special Keys:", Color::Yellow),
        Line::from("  /         - Filter channels by title or group"),
        Line::from("  r         - Refresh channels and guide data"),
        Line::from("  s         - Stop playback"),
        Line::from("  ?/F1      - Toggle this help"),
        Line::from("  Ctrl+C    - Force quit"),
        Line::from(""),
        heading("Playback:", Color::Yellow),
        Line::from("  • Streams play in an mpv window (ffplay fallback)"),
        Line::from("  • Failed direct streams retry once via the proxy"),
        Line::from("  • The guide pane marks the programme on air now"),
        Line::from(""),
        Line::from("Press any key to close this help"),
    ]
}

pub fn create_help_widget() -> Paragraph<'static> {
    Paragraph::new(get_help_lines())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue))
                .title(" Help "),
        )
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: false })
}
