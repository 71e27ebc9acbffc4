//! Quiz data model: question records and answer grading.

mod grading;
mod record;

pub use grading::{grade, parse_float};
pub use record::{Delivery, QuestionRecord, RecordStatus};
