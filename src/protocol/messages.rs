//! Quiz payloads carried inside hub invocations.
//!
//! Hub-to-client events arrive as a single JSON object argument. The
//! client-to-hub `SubmitAnswer` call uses positional arguments.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

/// Hub method that announces a new question.
pub const NEW_QUESTION: &str = "NewQuestion";

/// Hub method that delivers the grading of the latest answer.
pub const RECEIVE_RESULT: &str = "ReceiveResult";

/// Client-to-hub method reporting an answer.
pub const SUBMIT_ANSWER: &str = "SubmitAnswer";

/// Player name reported when none is configured.
pub const DEFAULT_PLAYER: &str = "Player";

/// Hub endpoint used when none is configured.
pub const DEFAULT_HUB_URL: &str = "http://localhost:5168/gamehub";

/// A question pushed by the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestion {
    pub expression: String,
    pub correct_answer: f64,
}

/// The hub's grading of the most recently submitted answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveResult {
    pub is_correct: bool,
    /// Echoed answer; `None` when the hub sends `null` or omits it.
    #[serde(default, deserialize_with = "answer_text")]
    pub user_answer: Option<String>,
}

/// An answer reported to the hub.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitAnswer {
    pub player: String,
    pub correct_answer: f64,
    /// Parsed user answer. NaN goes over the wire as `null`.
    pub user_answer: f64,
    pub is_correct: bool,
}

impl SubmitAnswer {
    /// Positional invocation arguments, in the order the hub expects.
    pub fn arguments(&self) -> Vec<Value> {
        vec![
            Value::from(self.player.clone()),
            Value::from(self.correct_answer),
            Value::from(self.user_answer),
            Value::from(self.is_correct),
        ]
    }
}

/// An inbound quiz event decoded from a hub invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum HubEvent {
    NewQuestion(NewQuestion),
    ReceiveResult(ReceiveResult),
}

impl HubEvent {
    /// Decode an invocation into a quiz event.
    ///
    /// Returns `Ok(None)` for targets the client does not handle.
    pub fn from_invocation(
        target: &str,
        arguments: Vec<Value>,
    ) -> Result<Option<Self>, ProtocolError> {
        match target {
            NEW_QUESTION => Ok(Some(Self::NewQuestion(single_argument(target, arguments)?))),
            RECEIVE_RESULT => Ok(Some(Self::ReceiveResult(single_argument(target, arguments)?))),
            _ => Ok(None),
        }
    }
}

fn single_argument<T: for<'de> Deserialize<'de>>(
    target: &str,
    arguments: Vec<Value>,
) -> Result<T, ProtocolError> {
    let actual = arguments.len();
    let [argument]: [Value; 1] = arguments.try_into().map_err(|_| ProtocolError::Arity {
        target: target.to_string(),
        expected: 1,
        actual,
    })?;
    Ok(serde_json::from_value(argument)?)
}

/// Accept the echoed answer as a string, a number or null.
fn answer_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        Value::Null => None,
        other => Some(other.to_string()),
    })
}
