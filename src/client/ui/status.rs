use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Padding, Paragraph};

use crate::client::{ConnectionState, PendingQuestionPolicy};
use crate::client::app::ClientApp;

/// Render connection status, score and the latest notice.
pub fn render(frame: &mut Frame, area: Rect, app: &ClientApp) {
    let (label, color) = connection_label(app.connection);
    let answered = app.quiz.records().len();

    let mut spans = vec![
        Span::styled(label, Style::default().fg(color).bold()),
        Span::styled(
            format!("  ·  {}  ·  Score: {}/{}", app.quiz.player(), app.quiz.score(), answered),
            Style::default().fg(Color::White),
        ),
    ];
    if app.quiz.policy() == PendingQuestionPolicy::Queue {
        spans.push(Span::styled(
            format!("  ·  {} queued", app.quiz.queued_len()),
            Style::default().fg(Color::Yellow),
        ));
    }

    let mut lines = vec![Line::from(spans)];
    if let Some(notice) = &app.notice {
        lines.push(Line::from(Span::styled(notice.clone(), Style::default().fg(Color::Red))));
    }

    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(Color::DarkGray)
            .padding(Padding::horizontal(1)),
    );

    frame.render_widget(widget, area);
}

fn connection_label(state: ConnectionState) -> (String, Color) {
    match state {
        ConnectionState::Connected => ("Connected".to_string(), Color::Green),
        ConnectionState::Reconnecting { attempt } => {
            (format!("Reconnecting (attempt {})", attempt), Color::Yellow)
        }
        ConnectionState::Disconnected => ("Disconnected".to_string(), Color::Red),
    }
}
