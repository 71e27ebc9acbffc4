//! Results table: one row per question.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Padding, Paragraph, Row, Table};

use crate::client::app::ClientApp;
use crate::models::{Delivery, QuestionRecord, RecordStatus};

/// Border plus header.
const TABLE_CHROME: u16 = 3;

/// Render the results table.
pub fn render(frame: &mut Frame, area: Rect, app: &ClientApp) {
    let records = app.quiz.records();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Results ")
        .title_style(Style::default().fg(Color::Cyan))
        .padding(Padding::horizontal(1));

    if records.is_empty() {
        let waiting = Paragraph::new("Waiting for the first question...")
            .alignment(Alignment::Center)
            .fg(Color::Yellow)
            .block(block);
        frame.render_widget(waiting, area);
        return;
    }

    let target = app.target_row();
    let visible = usize::from(area.height.saturating_sub(TABLE_CHROME)).max(1);
    let start = first_visible_row(records.len(), visible, target);

    let rows: Vec<Row> = records
        .iter()
        .enumerate()
        .skip(start)
        .take(visible)
        .map(|(index, record)| render_row(index, record, target, app))
        .collect();

    let header = Row::new(vec!["Expression", "Your Answer", "Result"])
        .style(Style::default().fg(Color::Cyan).bold());

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(35),
            Constraint::Percentage(35),
            Constraint::Percentage(30),
        ],
    )
    .header(header)
    .block(block);

    frame.render_widget(table, area);
}

fn render_row<'a>(
    index: usize,
    record: &'a QuestionRecord,
    target: Option<usize>,
    app: &'a ClientApp,
) -> Row<'a> {
    let is_target = target == Some(index);
    let is_selected = app.selected == Some(index);

    let marker = if is_target { "> " } else { "  " };
    let expression = Cell::from(Line::from(vec![
        Span::styled(marker, Style::default().fg(Color::Yellow)),
        Span::raw(record.display_expression()),
    ]));

    let answer = if is_target {
        Cell::from(Line::from(vec![
            Span::styled(app.quiz.input().to_string(), Style::default().fg(Color::Yellow)),
            Span::styled("_", Style::default().fg(Color::Yellow)),
        ]))
    } else if record.status() == RecordStatus::Pending {
        Cell::from(Span::styled("Type your answer", Style::default().fg(Color::DarkGray)))
    } else {
        Cell::from(record.user_answer().unwrap_or("").to_string())
    };

    let result = Cell::from(Line::from(vec![
        Span::styled(record.result_label(), result_style(record)),
        Span::styled(delivery_note(record), Style::default().fg(Color::DarkGray)),
    ]));

    let style = if is_selected {
        Style::default().bg(Color::DarkGray)
    } else {
        Style::default()
    };

    Row::new(vec![expression, answer, result]).style(style)
}

fn result_style(record: &QuestionRecord) -> Style {
    match record.is_correct() {
        None => Style::default().fg(Color::Yellow),
        Some(true) => Style::default().fg(Color::Green).bold(),
        Some(false) => Style::default().fg(Color::Red).bold(),
    }
}

fn delivery_note(record: &QuestionRecord) -> &'static str {
    if record.status() != RecordStatus::Submitted {
        return "";
    }
    match record.delivery() {
        Delivery::InFlight => " (sending)",
        Delivery::Failed => " (not delivered)",
        Delivery::NotSent | Delivery::Acknowledged => "",
    }
}

/// Keep the newest rows on screen, scrolling back only to show the target.
fn first_visible_row(len: usize, visible: usize, target: Option<usize>) -> usize {
    let start = len.saturating_sub(visible);
    match target {
        Some(target) if target < start => target,
        _ => start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_rows_stay_visible() {
        assert_eq!(first_visible_row(3, 10, None), 0);
        assert_eq!(first_visible_row(30, 10, None), 20);
        assert_eq!(first_visible_row(30, 10, Some(25)), 20);
    }

    #[test]
    fn scrolls_back_to_target() {
        assert_eq!(first_visible_row(30, 10, Some(4)), 4);
    }

    #[test]
    fn delivery_notes() {
        let mut record = QuestionRecord::new("1 + 1 = ?", 2.0);
        assert_eq!(delivery_note(&record), "");

        record.status = RecordStatus::Submitted;
        record.delivery = Delivery::InFlight;
        assert_eq!(delivery_note(&record), " (sending)");

        record.delivery = Delivery::Failed;
        assert_eq!(delivery_note(&record), " (not delivered)");

        record.status = RecordStatus::Resolved;
        assert_eq!(delivery_note(&record), "");
    }
}
