//! Hub wire protocol.
//!
//! Messages are JSON records terminated by `0x1E`, exchanged over a WebSocket.
//! The envelope lives in [`hub`]; the quiz payloads carried by invocations
//! live in `messages`.

pub mod hub;
mod messages;

pub use hub::{FrameDecoder, HubMessage, RECORD_SEPARATOR};
pub use messages::{
    DEFAULT_HUB_URL, DEFAULT_PLAYER, HubEvent, NEW_QUESTION, NewQuestion, RECEIVE_RESULT,
    ReceiveResult, SUBMIT_ANSWER, SubmitAnswer,
};
