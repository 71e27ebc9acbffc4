//! Quiz session state.
//!
//! [`QuizState`] is a pure state machine: it takes [`QuizEvent`]s from the hub
//! and the user and returns [`Effect`]s for the caller to carry out. It never
//! performs I/O.
//!
//! Hub results are applied to the *last* record, since the protocol carries no
//! question id. Callers must feed events in the order the hub sent them.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::error::StateError;
use crate::models::{Delivery, QuestionRecord, RecordStatus, grade};
use crate::protocol::{NewQuestion, ReceiveResult, SubmitAnswer};

/// What to do with a question that arrives while another is still unanswered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingQuestionPolicy {
    /// Append it anyway; several rows may await input at once.
    #[default]
    Append,
    /// Hold it until every earlier question has been graded by the hub.
    /// Held questions are released one at a time, oldest first.
    Queue,
}

/// Input to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum QuizEvent {
    /// The hub pushed a new question.
    NewQuestion { expression: String, correct_answer: f64 },
    /// The user answered the record at `index` with `raw_input`.
    UserSubmit { index: usize, raw_input: String },
    /// The user answered the record at `index` with the input buffer.
    SubmitInput { index: usize },
    /// The hub graded the most recent answer.
    /// `user_answer` is `None` when the hub echoed no answer.
    ReceiveResult {
        is_correct: bool,
        user_answer: Option<String>,
    },
    /// The hub accepted the submission for `index`.
    SubmitAcknowledged { index: usize },
    /// The submission for `index` never reached the hub.
    SubmitFailed { index: usize },
    InputChar(char),
    InputBackspace,
    InputClear,
}

impl From<NewQuestion> for QuizEvent {
    fn from(question: NewQuestion) -> Self {
        Self::NewQuestion {
            expression: question.expression,
            correct_answer: question.correct_answer,
        }
    }
}

impl From<ReceiveResult> for QuizEvent {
    fn from(result: ReceiveResult) -> Self {
        Self::ReceiveResult {
            is_correct: result.is_correct,
            user_answer: result.user_answer,
        }
    }
}

/// Work the caller must perform after applying an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send this answer to the hub and report back with
    /// [`QuizEvent::SubmitAcknowledged`] or [`QuizEvent::SubmitFailed`].
    SubmitRequested { index: usize, submission: SubmitAnswer },
}

/// The client's quiz history plus the answer being typed.
#[derive(Debug, Clone)]
pub struct QuizState {
    player: String,
    policy: PendingQuestionPolicy,
    records: Vec<QuestionRecord>,
    queued: VecDeque<NewQuestion>,
    input: String,
}

impl QuizState {
    /// Create an empty session for `player`.
    pub fn new(player: impl Into<String>, policy: PendingQuestionPolicy) -> Self {
        Self {
            player: player.into(),
            policy,
            records: Vec::new(),
            queued: VecDeque::new(),
            input: String::new(),
        }
    }

    /// Apply one event and return the effects it produced.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when a user action targets a record that does
    /// not exist or cannot take an answer. The state is left unchanged.
    pub fn apply(&mut self, event: QuizEvent) -> Result<Vec<Effect>, StateError> {
        match event {
            QuizEvent::NewQuestion {
                expression,
                correct_answer,
            } => {
                self.handle_new_question(NewQuestion {
                    expression,
                    correct_answer,
                });
                Ok(Vec::new())
            }
            QuizEvent::UserSubmit { index, raw_input } => self.handle_submit(index, raw_input),
            QuizEvent::SubmitInput { index } => {
                let raw_input = self.input.clone();
                self.handle_submit(index, raw_input)
            }
            QuizEvent::ReceiveResult {
                is_correct,
                user_answer,
            } => {
                self.handle_result(is_correct, user_answer);
                Ok(Vec::new())
            }
            QuizEvent::SubmitAcknowledged { index } => {
                let record = self.record_mut(index)?;
                if record.delivery == Delivery::InFlight {
                    record.delivery = Delivery::Acknowledged;
                }
                Ok(Vec::new())
            }
            QuizEvent::SubmitFailed { index } => {
                self.handle_submit_failed(index)?;
                Ok(Vec::new())
            }
            QuizEvent::InputChar(c) => {
                self.input.push(c);
                Ok(Vec::new())
            }
            QuizEvent::InputBackspace => {
                self.input.pop();
                Ok(Vec::new())
            }
            QuizEvent::InputClear => {
                self.input.clear();
                Ok(Vec::new())
            }
        }
    }

    fn handle_new_question(&mut self, question: NewQuestion) {
        let held = self.has_open() || !self.queued.is_empty();
        if self.policy == PendingQuestionPolicy::Queue && held {
            debug!(expression = %question.expression, "question queued behind unresolved one");
            self.queued.push_back(question);
            return;
        }

        self.append(question);
    }

    fn append(&mut self, question: NewQuestion) {
        self.records
            .push(QuestionRecord::new(question.expression, question.correct_answer));
        self.input.clear();
    }

    fn handle_submit(
        &mut self,
        index: usize,
        raw_input: String,
    ) -> Result<Vec<Effect>, StateError> {
        let player = self.player.clone();
        let record = self.record_mut(index)?;
        if !record.accepts_input() {
            return Err(StateError::AlreadyAnswered { index });
        }

        let (parsed, is_correct) = grade(&raw_input, record.correct_answer);
        record.user_answer = Some(raw_input);
        record.is_correct = Some(is_correct);
        record.status = RecordStatus::Submitted;
        record.delivery = Delivery::InFlight;

        let submission = SubmitAnswer {
            player,
            correct_answer: record.correct_answer,
            user_answer: parsed,
            is_correct,
        };

        self.input.clear();

        Ok(vec![Effect::SubmitRequested { index, submission }])
    }

    fn handle_result(&mut self, is_correct: bool, user_answer: Option<String>) {
        let Some(record) = self.records.last_mut() else {
            warn!("result received before any question; ignoring");
            return;
        };

        record.is_correct = Some(is_correct);
        record.user_answer = user_answer;
        record.status = RecordStatus::Resolved;

        self.release_queued();
    }

    fn handle_submit_failed(&mut self, index: usize) -> Result<(), StateError> {
        let record = self.record_mut(index)?;
        if record.status != RecordStatus::Submitted {
            // Already graded by the hub; nothing left to retry.
            return Ok(());
        }

        record.delivery = Delivery::Failed;
        let answer = record.user_answer.clone().unwrap_or_default();
        if self.input.is_empty() {
            self.input = answer;
        }
        Ok(())
    }

    /// Append the oldest held question once every record is resolved.
    fn release_queued(&mut self) {
        if self.has_open() {
            return;
        }
        if let Some(question) = self.queued.pop_front() {
            self.append(question);
        }
    }

    /// Whether some record still waits for an answer or for the hub's result.
    fn has_open(&self) -> bool {
        self.records.iter().any(|r| r.status != RecordStatus::Resolved)
    }

    fn record_mut(&mut self, index: usize) -> Result<&mut QuestionRecord, StateError> {
        let len = self.records.len();
        self.records
            .get_mut(index)
            .ok_or(StateError::NoSuchRecord { index, len })
    }

    pub fn player(&self) -> &str {
        &self.player
    }

    pub fn policy(&self) -> PendingQuestionPolicy {
        self.policy
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[QuestionRecord] {
        &self.records
    }

    /// The answer currently being typed.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Questions held back under [`PendingQuestionPolicy::Queue`].
    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    /// Indices of records that accept an answer, oldest first.
    pub fn awaiting_input(&self) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.accepts_input())
            .map(|(i, _)| i)
            .collect()
    }

    /// The most recent record that accepts an answer.
    pub fn latest_awaiting_input(&self) -> Option<usize> {
        self.records.iter().rposition(QuestionRecord::accepts_input)
    }

    /// Number of records currently graded correct.
    pub fn score(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.is_correct == Some(true))
            .count()
    }
}
