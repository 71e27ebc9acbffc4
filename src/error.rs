//! Error types for the hub client, the protocol codec and the quiz state.

use std::io;

use thiserror::Error;

/// Failure to establish the initial hub connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The hub URL could not be turned into a WebSocket endpoint.
    #[error("invalid hub url {url}: {reason}")]
    InvalidUrl {
        /// The URL as configured.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The underlying transport could not be opened.
    #[error("transport error: {0}")]
    Transport(String),

    /// The hub rejected or garbled the protocol handshake.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The hub did not answer the handshake in time.
    #[error("handshake timed out")]
    HandshakeTimeout,

    /// The transport closed before the handshake completed.
    #[error("connection closed during handshake")]
    Closed,
}

/// Failure of an outbound `SubmitAnswer` call.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The client is not currently connected; nothing was sent.
    #[error("not connected to the hub")]
    NotConnected,

    /// The connection dropped before the hub acknowledged the call.
    #[error("connection lost before the hub answered")]
    ConnectionLost,

    /// The hub completed the invocation with an error.
    #[error("hub error: {0}")]
    Hub(String),

    /// The hub did not complete the invocation in time.
    #[error("hub did not answer in time")]
    Timeout,

    /// The invocation could not be serialized.
    #[error("failed to encode invocation: {0}")]
    Encode(#[from] serde_json::Error),
}

/// An I/O failure on an open transport.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// A frame or payload that does not follow the hub protocol.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The record is not valid JSON for the expected shape.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A required field is absent for the message type.
    #[error("message type {kind} is missing `{field}`")]
    MissingField {
        /// Numeric hub message type.
        kind: u8,
        /// Name of the absent field.
        field: &'static str,
    },

    /// An invocation carried the wrong number of arguments.
    #[error("`{target}` expects {expected} argument(s), got {actual}")]
    Arity {
        /// Invocation target.
        target: String,
        /// Expected argument count.
        expected: usize,
        /// Actual argument count.
        actual: usize,
    },
}

/// A user action aimed at a record that cannot take it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// No record exists at the index.
    #[error("no question at index {index} (session has {len})")]
    NoSuchRecord {
        /// Requested index.
        index: usize,
        /// Current session length.
        len: usize,
    },

    /// The record already has an answer in flight or resolved.
    #[error("question {index} has already been answered")]
    AlreadyAnswered {
        /// Requested index.
        index: usize,
    },
}

/// Top-level error for running the quiz client.
#[derive(Debug, Error)]
pub enum QuizError {
    /// Could not connect to the hub.
    #[error("failed to connect: {0}")]
    Connection(#[from] ConnectionError),

    /// Terminal or log-file IO failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl SubmitError {
    /// Returns true if the failure was caused by the link, not by the hub.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::NotConnected | Self::ConnectionLost | Self::Timeout)
    }
}
