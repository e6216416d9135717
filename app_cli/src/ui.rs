use login::{FieldKind, LoginFlow, SettingsEditor};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};
use settings_manager::Settings;

const LOGIN_HINTS: &str = "Enter: log in | Ctrl+S: settings | Ctrl+R: reset | Esc: quit";
const EDITOR_HINTS: &str = "Up/Down: move | Space: toggle | Enter: save | Esc: cancel";

/// Draw whichever screen is current
pub fn draw(f: &mut Frame, flow: &LoginFlow, session: Option<&Settings>) {
    if let Some(settings) = session {
        draw_session(f, settings);
        return;
    }

    draw_login(f, flow);
    if let Some(editor) = flow.editor() {
        draw_editor(f, editor);
    }
}

fn draw_login(f: &mut Frame, flow: &LoginFlow) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(3), // Name input
            Constraint::Length(1), // Field error
            Constraint::Length(3), // Submit button
            Constraint::Min(0),
            Constraint::Length(1), // Key hints
        ])
        .split(f.size());

    let title = Paragraph::new(Line::from(vec![
        Span::styled(
            "softphone",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" - SIP over WebSocket"),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(title, chunks[0]);

    let name_style = if flow.name_error().is_some() {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };
    let name = Paragraph::new(Line::from(vec![
        Span::raw(flow.display_name()),
        Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
    ]))
    .block(
        Block::default()
            .title("Your Name")
            .borders(Borders::ALL)
            .border_style(name_style),
    );
    f.render_widget(name, chunks[1]);

    if let Some(error) = flow.name_error() {
        let error = Paragraph::new(error).style(Style::default().fg(Color::Red));
        f.render_widget(error, chunks[2]);
    }

    let submit_style = if flow.can_submit() {
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let submit = Paragraph::new("[ Log in ]")
        .alignment(Alignment::Center)
        .style(submit_style)
        .block(Block::default().borders(Borders::ALL).border_style(submit_style));
    f.render_widget(submit, centered_rect(30, chunks[3]));

    let hints = Paragraph::new(LOGIN_HINTS)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
    f.render_widget(hints, chunks[5]);
}

fn draw_editor(f: &mut Frame, editor: &SettingsEditor) {
    let area = popup_rect(80, 80, f.size());
    f.render_widget(Clear, area);

    let block = Block::default().title("Settings").borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Fields
            Constraint::Length(1), // Field error
            Constraint::Length(1), // Key hints
        ])
        .split(inner);

    let items: Vec<ListItem> = editor
        .fields()
        .map(|(field, value)| {
            let shown = match field.kind() {
                FieldKind::Secret => "*".repeat(value.chars().count()),
                _ => value.to_string(),
            };
            let label_style = match editor.error() {
                Some(error) if error.field == field => Style::default().fg(Color::Red),
                _ => Style::default().fg(Color::Cyan),
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<20}", field.label()), label_style),
                Span::raw(shown),
            ]))
        })
        .collect();

    let focused = editor
        .fields()
        .position(|(field, _)| field == editor.focused());
    let mut state = ListState::default();
    state.select(focused);

    let list = List::new(items)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    f.render_stateful_widget(list, chunks[0], &mut state);

    if let Some(error) = editor.error() {
        let error = Paragraph::new(format!("{}: {}", error.field.label(), error.message))
            .style(Style::default().fg(Color::Red));
        f.render_widget(error, chunks[1]);
    }

    let hints = Paragraph::new(EDITOR_HINTS).style(Style::default().fg(Color::DarkGray));
    f.render_widget(hints, chunks[2]);
}

fn draw_session(f: &mut Frame, settings: &Settings) {
    let text = Text::from(vec![
        Line::from(vec![
            Span::raw("Logged in as "),
            Span::styled(
                settings.display_name.as_deref().unwrap_or_default(),
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::raw(""),
        Line::raw(format!(
            "URI:        {}",
            settings.uri.as_deref().unwrap_or_default()
        )),
        Line::raw(format!("WebSocket:  {}", settings.socket.uri)),
        Line::raw(format!("Transport:  {}", settings.socket.via_transport)),
        Line::raw(""),
        Line::raw("Press any key to exit"),
    ]);

    let session = Paragraph::new(text).block(
        Block::default()
            .title("Session")
            .borders(Borders::ALL),
    );
    f.render_widget(session, popup_rect(80, 60, f.size()));
}

/// `width` columns, horizontally centered in `area`
fn centered_rect(width: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    Rect {
        x: area.x + (area.width - width) / 2,
        width,
        ..area
    }
}

/// Rect covering the given percentages of `area`, centered
fn popup_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
