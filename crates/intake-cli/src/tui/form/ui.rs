//! Form rendering

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use intake_core::monitor::badge_for;
use intake_core::Field;

use super::app::{placeholder, FormApp, InputMode};
use crate::tui::badge_color;

/// Width of the label column
const LABEL_WIDTH: usize = 32;

/// Main UI rendering function
pub fn draw(frame: &mut Frame, app: &FormApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0]);
    draw_fields(frame, app, chunks[1]);
    draw_status_bar(frame, app, chunks[2]);

    if app.input_mode == InputMode::Picking {
        draw_picker(frame, app);
    }

    if app.show_help {
        draw_help_overlay(frame);
    }
}

fn draw_header(frame: &mut Frame, app: &FormApp, area: Rect) {
    let badge = badge_for(Some(app.status));
    let sent = match app.last_sent {
        Some(status) => format!("  synced {} ({})", app.sent_count, status),
        None => "  not synced yet".to_string(),
    };

    let line = Line::from(vec![
        Span::styled(
            "Patient Registration",
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            format!(" {} ", badge.label),
            Style::default()
                .fg(Color::Black)
                .bg(badge_color(badge.color)),
        ),
        Span::styled(sent, Style::default().add_modifier(Modifier::DIM)),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .title(" Please fill in your details below ");
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_fields(frame: &mut Frame, app: &FormApp, area: Rect) {
    let mut lines = Vec::new();
    let mut cursor = None;

    for (index, field) in Field::ALL.iter().enumerate() {
        let selected = index == app.field_index;
        let editing = selected && app.input_mode == InputMode::Editing;

        let marker = if selected { "› " } else { "  " };
        let required = if field.is_required() { "*" } else { " " };
        let label = format!("{}{}{}", marker, field.label(), required);
        let label_style = if selected {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        let value_span = if editing {
            let x = area.x + LABEL_WIDTH as u16 + app.cursor as u16;
            cursor = Some((x, area.y + lines.len() as u16));
            Span::styled(app.input.clone(), Style::default().fg(Color::Yellow))
        } else {
            match app.values.get(*field) {
                Some(value) => Span::raw(value),
                None => Span::styled(
                    placeholder(*field),
                    Style::default().add_modifier(Modifier::DIM),
                ),
            }
        };

        lines.push(Line::from(vec![
            Span::styled(format!("{:<width$}", label, width = LABEL_WIDTH), label_style),
            value_span,
        ]));

        if let Some(message) = app.errors.get(field) {
            lines.push(Line::from(vec![
                Span::raw(" ".repeat(LABEL_WIDTH)),
                Span::styled(*message, Style::default().fg(Color::Red)),
            ]));
        }
    }

    frame.render_widget(Paragraph::new(lines), area);

    if let Some(position) = cursor {
        frame.set_cursor_position(position);
    }
}

fn draw_status_bar(frame: &mut Frame, app: &FormApp, area: Rect) {
    let content = if let Some(msg) = &app.status_message {
        msg.clone()
    } else {
        match app.input_mode {
            InputMode::Normal => "j/k:move  enter:edit  x:clear  s:submit  ?:help  q:quit",
            InputMode::Editing => "type to edit  enter/esc:done  tab:next field",
            InputMode::Picking => "type to search  ↑/↓:choose  enter:select  esc:cancel",
        }
        .to_string()
    };

    let style = if app.is_submitted() {
        Style::default().fg(Color::Green)
    } else {
        Style::default().add_modifier(Modifier::DIM)
    };
    frame.render_widget(Paragraph::new(content).style(style), area);
}

/// Option list for a choice field
fn draw_picker(frame: &mut Frame, app: &FormApp) {
    let area = frame.area();
    let options = app.filtered_options();

    let popup_width = 40.min(area.width.saturating_sub(4));
    let popup_height = 14.min(area.height.saturating_sub(4));
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(popup_area);

    let search = Paragraph::new(Line::from(vec![
        Span::styled("/", Style::default().fg(Color::Cyan)),
        Span::raw(app.picker_filter.as_str()),
    ]))
    .block(
        Block::default()
            .title(format!(" {} ", app.current_field().label()))
            .borders(Borders::ALL)
            .border_style(Style::default().add_modifier(Modifier::BOLD)),
    );
    frame.render_widget(search, chunks[0]);

    let items: Vec<ListItem> = if options.is_empty() {
        vec![ListItem::new(Span::styled(
            "No matches",
            Style::default().add_modifier(Modifier::DIM),
        ))]
    } else {
        options.into_iter().map(ListItem::new).collect()
    };

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .add_modifier(Modifier::REVERSED),
        );

    let mut state = ListState::default();
    state.select(Some(app.picker_index));
    frame.render_stateful_widget(list, chunks[1], &mut state);
}

/// Draw help overlay
fn draw_help_overlay(frame: &mut Frame) {
    let area = frame.area();

    let popup_width = 50.min(area.width.saturating_sub(4));
    let popup_height = 16.min(area.height.saturating_sub(4));
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(vec![Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from("  j/k, ↑/↓    Move between fields"),
        Line::from("  Enter, i    Edit field / open options"),
        Line::from("  Tab         Next field (while editing)"),
        Line::from("  x           Clear field"),
        Line::from("  s           Submit registration"),
        Line::from("  q           Quit"),
        Line::from(""),
        Line::from("Changes are sent to the staff as you type."),
        Line::from("Fields marked * are required."),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().add_modifier(Modifier::BOLD));

    frame.render_widget(Paragraph::new(help_text).block(block), popup_area);
}
