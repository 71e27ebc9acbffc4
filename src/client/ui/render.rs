//! Main client UI renderer.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::client::app::ClientApp;

use super::{quiz, status};

/// Render the whole client screen.
pub fn render(frame: &mut Frame, app: &ClientApp) {
    let area = frame.area();
    frame.render_widget(Block::default().bg(Color::Reset), area);

    let chunks = Layout::vertical([
        Constraint::Length(2), // Title
        Constraint::Min(6),    // Results table
        Constraint::Length(3), // Status
        Constraint::Length(1), // Controls
    ])
    .margin(1)
    .split(area);

    render_title(frame, chunks[0], app);
    quiz::render(frame, chunks[1], app);
    status::render(frame, chunks[2], app);
    render_controls(frame, chunks[3]);
}

fn render_title(frame: &mut Frame, area: Rect, app: &ClientApp) {
    let title = Line::from(vec![
        Span::styled("MATH GAME", Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!("  ·  {}", app.hub_url), Style::default().fg(Color::DarkGray)),
    ]);

    let widget = Paragraph::new(title)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM).border_style(Color::DarkGray));

    frame.render_widget(widget, area);
}

fn render_controls(frame: &mut Frame, area: Rect) {
    let controls = "type your answer  ·  Enter submit  ·  ↑/↓ pick question  ·  Esc quit";
    let widget = Paragraph::new(controls)
        .alignment(Alignment::Center)
        .fg(Color::DarkGray);

    frame.render_widget(widget, area);
}
