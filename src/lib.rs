//! # math-game
//!
//! A real-time arithmetic quiz client. Questions are pushed by a hub over a
//! WebSocket, answered in the terminal, and each answer is sent back to the
//! hub, which replies with its own verdict.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use math_game::{ClientConfig, SessionClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new("http://localhost:5168/gamehub");
//!     let client = SessionClient::connect(config).await?;
//!
//!     client.on_new_question(|question| {
//!         println!("{}", question.expression);
//!     });
//!
//!     client.submit_answer("Player", 4.0, 4.0, true).await?;
//!     client.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod protocol;
pub mod terminal;

pub use client::{
    ConnectionState, Effect, PendingQuestionPolicy, QuizEvent, QuizState, SessionClient, run,
};
pub use config::ClientConfig;
pub use error::{
    ConnectionError, ProtocolError, QuizError, StateError, SubmitError, TransportError,
};
pub use models::{Delivery, QuestionRecord, RecordStatus, grade, parse_float};
pub use protocol::{NewQuestion, ReceiveResult, SubmitAnswer};
