//! Monitor rendering

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use intake_core::monitor::InfoSection;
use intake_core::relay::ConnectionStatus;

use super::MonitorApp;
use crate::tui::badge_color;

/// Main UI rendering function
pub fn draw(frame: &mut Frame, app: &MonitorApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0]);

    if app.state.snapshot().is_some() {
        draw_sections(frame, &app.state.sections(), chunks[1]);
    } else {
        draw_waiting(frame, app, chunks[1]);
    }

    draw_status_bar(frame, app, chunks[2]);
    draw_connection_indicator(frame, app);
}

fn draw_header(frame: &mut Frame, app: &MonitorApp, area: Rect) {
    let mut spans = vec![
        Span::styled("Patient Monitor", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(
            "  Real-time synchronization",
            Style::default().add_modifier(Modifier::DIM),
        ),
    ];

    if app.state.snapshot().is_some() {
        let badge = app.state.badge();
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!(" {} ", badge.label),
            Style::default()
                .fg(Color::Black)
                .bg(badge_color(badge.color))
                .add_modifier(Modifier::BOLD),
        ));
    }

    let block = Block::default().borders(Borders::BOTTOM);
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn draw_waiting(frame: &mut Frame, app: &MonitorApp, area: Rect) {
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            app.state.waiting_message(),
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];
    if let Some(error) = &app.last_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

/// Sections in a two-by-two grid
fn draw_sections(frame: &mut Frame, sections: &[InfoSection], area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let cells: Vec<Rect> = rows
        .iter()
        .flat_map(|row| {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(*row)
                .to_vec()
        })
        .collect();

    for (section, cell) in sections.iter().zip(cells) {
        draw_section(frame, section, cell);
    }
}

fn draw_section(frame: &mut Frame, section: &InfoSection, area: Rect) {
    let label_width = section
        .rows
        .iter()
        .map(|row| row.label.len() + 2)
        .max()
        .unwrap_or(0);

    let lines: Vec<Line> = section
        .rows
        .iter()
        .map(|row| {
            let value_style = if row.is_provided() {
                Style::default()
            } else {
                Style::default()
                    .add_modifier(Modifier::DIM)
                    .add_modifier(Modifier::ITALIC)
            };
            Line::from(vec![
                Span::styled(
                    format!("{:<width$}", format!("{}:", row.label), width = label_width),
                    Style::default().add_modifier(Modifier::DIM),
                ),
                Span::styled(row.display_value().to_string(), value_style),
            ])
        })
        .collect();

    let block = Block::default()
        .title(format!(" {} ", section.title))
        .borders(Borders::ALL);
    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn draw_status_bar(frame: &mut Frame, app: &MonitorApp, area: Rect) {
    let last = app
        .state
        .last_received_at()
        .map(|at| {
            at.with_timezone(&chrono::Local)
                .format("%H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "-".to_string());

    let content = format!(
        "{}  updates: {}  last: {}  q:quit",
        app.url,
        app.state.received(),
        last
    );
    let paragraph = Paragraph::new(content).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

/// Connection indicator in top-right corner
fn draw_connection_indicator(frame: &mut Frame, app: &MonitorApp) {
    let area = frame.area();
    if area.width < 5 {
        return;
    }

    let (icon, style) = match app.connection {
        ConnectionStatus::Subscribed => ("✓", Style::default().fg(Color::Green)),
        ConnectionStatus::Connected | ConnectionStatus::Connecting => {
            ("↻", Style::default().fg(Color::Yellow))
        }
        ConnectionStatus::Disconnected if app.last_error.is_some() => {
            ("✗", Style::default().fg(Color::Red))
        }
        ConnectionStatus::Disconnected => ("⚡", Style::default().fg(Color::DarkGray)),
    };

    let indicator = Paragraph::new(Span::styled(icon, style));
    let indicator_area = Rect::new(area.width - 2, 0, 1, 1);
    frame.render_widget(indicator, indicator_area);
}
