/// Where a record is in its lifecycle. Records only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// Waiting for the user's answer.
    Pending,
    /// Answered locally, waiting for the hub's grading.
    Submitted,
    /// Graded by the hub.
    Resolved,
}

/// Delivery of the outbound `SubmitAnswer` call for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    NotSent,
    InFlight,
    Acknowledged,
    Failed,
}

/// One question's history: what was asked, what was answered, how it went.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionRecord {
    pub(crate) expression: String,
    pub(crate) correct_answer: f64,
    pub(crate) user_answer: Option<String>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) status: RecordStatus,
    pub(crate) delivery: Delivery,
}

impl QuestionRecord {
    /// Create a pending record for a freshly received question.
    pub fn new(expression: impl Into<String>, correct_answer: f64) -> Self {
        Self {
            expression: expression.into(),
            correct_answer,
            user_answer: None,
            is_correct: None,
            status: RecordStatus::Pending,
            delivery: Delivery::NotSent,
        }
    }

    /// The expression as sent by the hub.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The expression with everything after the first `=` replaced by `= ?`.
    pub fn display_expression(&self) -> String {
        let lhs = self.expression.split('=').next().unwrap_or("").trim();
        format!("{} = ?", lhs)
    }

    pub fn correct_answer(&self) -> f64 {
        self.correct_answer
    }

    /// The user's literal answer, or the hub's echo of it once resolved.
    pub fn user_answer(&self) -> Option<&str> {
        self.user_answer.as_deref()
    }

    pub fn is_correct(&self) -> Option<bool> {
        self.is_correct
    }

    pub fn status(&self) -> RecordStatus {
        self.status
    }

    pub fn delivery(&self) -> Delivery {
        self.delivery
    }

    /// Whether the user can (re)submit an answer for this record.
    ///
    /// True while pending, and again after a submission failed to reach the
    /// hub and the hub has not graded the record since.
    pub fn accepts_input(&self) -> bool {
        match self.status {
            RecordStatus::Pending => true,
            RecordStatus::Submitted => self.delivery == Delivery::Failed,
            RecordStatus::Resolved => false,
        }
    }

    /// Text for the result column.
    pub fn result_label(&self) -> &'static str {
        match self.is_correct {
            None => "Waiting for Answer",
            Some(true) => "OK",
            Some(false) => "FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_pending() {
        let record = QuestionRecord::new("2 + 2 = ?", 4.0);
        assert_eq!(record.status(), RecordStatus::Pending);
        assert_eq!(record.delivery(), Delivery::NotSent);
        assert_eq!(record.user_answer(), None);
        assert_eq!(record.is_correct(), None);
        assert!(record.accepts_input());
        assert_eq!(record.result_label(), "Waiting for Answer");
    }

    #[test]
    fn display_expression_strips_rhs() {
        assert_eq!(QuestionRecord::new("2 + 2 = 4", 4.0).display_expression(), "2 + 2 = ?");
        assert_eq!(QuestionRecord::new("7*6=?", 42.0).display_expression(), "7*6 = ?");
        assert_eq!(QuestionRecord::new(" 9 - 3 ", 6.0).display_expression(), "9 - 3 = ?");
        assert_eq!(QuestionRecord::new("", 0.0).display_expression(), " = ?");
    }

    #[test]
    fn failed_delivery_reopens_input() {
        let mut record = QuestionRecord::new("1 + 1 = ?", 2.0);
        record.status = RecordStatus::Submitted;
        record.delivery = Delivery::InFlight;
        assert!(!record.accepts_input());

        record.delivery = Delivery::Failed;
        assert!(record.accepts_input());

        record.status = RecordStatus::Resolved;
        assert!(!record.accepts_input());
    }

    #[test]
    fn result_labels() {
        let mut record = QuestionRecord::new("1 + 1 = ?", 2.0);
        record.is_correct = Some(true);
        assert_eq!(record.result_label(), "OK");
        record.is_correct = Some(false);
        assert_eq!(record.result_label(), "FAILED");
    }
}
