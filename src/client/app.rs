//! View state for the terminal client.

use tracing::warn;

use crate::config::ClientConfig;

use super::session::ConnectionState;
use super::state::{Effect, QuizEvent, QuizState};

/// Everything the UI needs to draw a frame.
pub struct ClientApp {
    /// Quiz history and the answer being typed.
    pub quiz: QuizState,
    /// Last known connection status.
    pub connection: ConnectionState,
    /// Hub URL, for display.
    pub hub_url: String,
    /// Row picked with the arrow keys, if any.
    pub selected: Option<usize>,
    /// Latest message for the user (e.g. a failed submit).
    pub notice: Option<String>,
    /// Whether the client should quit.
    pub should_quit: bool,
}

impl ClientApp {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            quiz: QuizState::new(config.player.clone(), config.pending_policy),
            connection: ConnectionState::Connected,
            hub_url: config.hub_url.clone(),
            selected: None,
            notice: None,
            should_quit: false,
        }
    }

    /// Feed an event to the quiz state, turning rejected actions into a notice.
    pub fn apply(&mut self, event: QuizEvent) -> Vec<Effect> {
        let submitted = matches!(
            event,
            QuizEvent::SubmitInput { .. } | QuizEvent::UserSubmit { .. }
        );

        match self.quiz.apply(event) {
            Ok(effects) => {
                if submitted {
                    self.selected = None;
                    self.notice = None;
                }
                effects
            }
            Err(e) => {
                warn!(error = %e, "quiz action rejected");
                self.notice = Some(e.to_string());
                Vec::new()
            }
        }
    }

    /// The row Enter submits to: the selected row if it takes an answer,
    /// otherwise the latest row that does.
    pub fn target_row(&self) -> Option<usize> {
        self.selected
            .filter(|&i| self.quiz.records().get(i).is_some_and(|r| r.accepts_input()))
            .or_else(|| self.quiz.latest_awaiting_input())
    }

    /// Submit the input buffer to the target row.
    pub fn submit(&mut self) -> Vec<Effect> {
        match self.target_row() {
            Some(index) => self.apply(QuizEvent::SubmitInput { index }),
            None => {
                self.notice = Some("No question is waiting for an answer".to_string());
                Vec::new()
            }
        }
    }

    /// Move the selection down.
    pub fn select_next(&mut self) {
        let len = self.quiz.records().len();
        if len == 0 {
            return;
        }
        let current = self.selected.or_else(|| self.target_row()).unwrap_or(0);
        self.selected = Some((current + 1).min(len - 1));
    }

    /// Move the selection up.
    pub fn select_previous(&mut self) {
        if self.quiz.records().is_empty() {
            return;
        }
        let current = self.selected.or_else(|| self.target_row()).unwrap_or(0);
        self.selected = Some(current.saturating_sub(1));
    }

    pub fn set_connection(&mut self, state: ConnectionState) {
        self.connection = state;
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }
}
