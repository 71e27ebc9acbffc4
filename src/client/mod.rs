//! Quiz client module.
//!
//! [`SessionClient`] talks to the hub, [`QuizState`] keeps the quiz history,
//! and [`run`] ties both to the terminal UI.

mod app;
mod client;
mod session;
mod state;
pub mod transport;
mod ui;

pub use client::run;
pub use session::{ConnectionState, SessionClient};
pub use state::{Effect, PendingQuestionPolicy, QuizEvent, QuizState};
