// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use super::app::{App, Severity};
use super::widgets::{centered_rect, create_help_widget};

pub fn draw(frame: &mut Frame, app: &mut App) {
    let size = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer
        ])
        .split(size);

    draw_header(frame, app, chunks[0]);
    draw_content(frame, app, chunks[1]);
    draw_footer(frame, app, chunks[2]);

    draw_notifications(frame, app, size);

    if app.show_help {
        draw_help_overlay(frame, size);
    }

    if app.loading {
        draw_loading_overlay(frame, size);
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let header = Paragraph::new(app.status_line())
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue))
                .title(" tvgrid "),
        );

    frame.render_widget(header, area);
}

fn draw_content(frame: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(40),    // Channel list
            Constraint::Length(46), // Guide panel
        ])
        .split(area);

    draw_channel_list(frame, app, chunks[0]);
    draw_guide_panel(frame, app, chunks[1]);
}

fn draw_channel_list(frame: &mut Frame, app: &mut App, area: Rect) {
    let title = if app.search_query.is_empty() {
        " Channels ".to_string()
    } else {
        format!(" Channels (filter: {}) ", app.search_query)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(title);

    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    app.update_visible_height(inner_area.height as usize);

    if app.filtered_indices.is_empty() {
        let message = if app.channels.is_empty() {
            "No channels found"
        } else {
            "No channels match the filter"
        };
        let empty_msg = Paragraph::new(message)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(empty_msg, inner_area);
        return;
    }

    let playing = app.playback.active_index();
    let visible_height = inner_area.height as usize;
    let start = app.scroll_offset;
    let end = (start + visible_height).min(app.filtered_indices.len());

    let items: Vec<ListItem> = app.filtered_indices[start..end]
        .iter()
        .enumerate()
        .map(|(i, &channel_index)| {
            let channel = &app.channels[channel_index];
            let position = start + i;

            let marker = if playing == Some(channel_index) {
                "▶ "
            } else {
                "  "
            };
            let group = channel.group.as_deref().unwrap_or("Uncategorized");

            // Rows carry the channel's original index, not its filtered
            // position, so selection stays correct under any filter.
            let line = Line::from(vec![
                Span::raw(marker),
                Span::styled(
                    format!("{:>4} ", channel_index),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(channel.title.clone()),
                Span::styled(format!("  [{}]", group), Style::default().fg(Color::DarkGray)),
            ]);

            let line = if position == app.cursor {
                line.style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                line
            };

            ListItem::new(line)
        })
        .collect();

    let list = List::new(items).style(Style::default().fg(Color::White));
    frame.render_widget(list, inner_area);
}

fn draw_guide_panel(frame: &mut Frame, app: &App, area: Rect) {
    let title = match app.selected_channel() {
        Some((_, channel)) => format!(" Guide - {} ", channel.title),
        None => " Guide ".to_string(),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(title);

    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    if app.selected_channel().is_none() {
        let msg = Paragraph::new("Select a channel to see its guide")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(msg, inner_area);
        return;
    }

    if app.guide_rows.is_empty() {
        let msg = Paragraph::new("No programme information available")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(msg, inner_area);
        return;
    }

    let items: Vec<ListItem> = app
        .guide_rows
        .iter()
        .take(inner_area.height as usize)
        .map(|row| {
            let time = match &row.stop {
                Some(stop) => format!("{} - {}", row.start, stop),
                None => row.start.clone(),
            };

            let (marker, style) = if row.airing_now {
                (
                    "● ",
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                ("  ", Style::default().fg(Color::White))
            };

            ListItem::new(Line::from(vec![
                Span::styled(marker, style),
                Span::styled(time, Style::default().fg(Color::DarkGray)),
                Span::raw("  "),
                Span::styled(row.title.clone(), style),
            ]))
        })
        .collect();

    frame.render_widget(List::new(items), inner_area);
}

fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    let text = if app.search_active {
        Line::from(vec![
            Span::styled("Search: ", Style::default().fg(Color::Yellow)),
            Span::raw(app.search_query.clone()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ])
    } else {
        Line::from(
            "Enter play | ↑/↓ zap | j/k move | / search | r refresh | s stop | ? help | q quit",
        )
    };

    let footer = Paragraph::new(text)
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Left)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        );

    frame.render_widget(footer, area);
}

/// Toasts stack bottom-up in the lower-right corner, newest at the
/// bottom, each on its own row.
fn draw_notifications(frame: &mut Frame, app: &App, area: Rect) {
    let width = 40u16.min(area.width);

    for (i, notification) in app.notifications.iter().rev().enumerate() {
        let row = area
            .height
            .saturating_sub(4)
            .saturating_sub(i as u16);
        if row == 0 {
            break;
        }

        let color = match notification.severity {
            Severity::Info => Color::Blue,
            Severity::Success => Color::Green,
            Severity::Warning => Color::Yellow,
            Severity::Error => Color::Red,
        };

        let rect = Rect {
            x: area.width.saturating_sub(width + 1),
            y: row,
            width,
            height: 1,
        };

        let toast = Paragraph::new(notification.message.clone())
            .style(Style::default().fg(Color::Black).bg(color))
            .alignment(Alignment::Center);

        frame.render_widget(Clear, rect);
        frame.render_widget(toast, rect);
    }
}

fn draw_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);
    frame.render_widget(create_help_widget(), popup_area);
}

fn draw_loading_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(30, 10, area);
    frame.render_widget(Clear, popup_area);

    let loading = Paragraph::new("Loading...")
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        );

    frame.render_widget(loading, popup_area);
}
