//! Hub message envelope and record framing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConnectionError, ProtocolError};

/// Terminates every JSON record on the wire.
pub const RECORD_SEPARATOR: char = '\u{1e}';

/// Name of the hub sub-protocol negotiated during the handshake.
pub const PROTOCOL_NAME: &str = "json";

/// Version of the hub sub-protocol.
pub const PROTOCOL_VERSION: u32 = 1;

const INVOCATION: u8 = 1;
const COMPLETION: u8 = 3;
const PING: u8 = 6;
const CLOSE: u8 = 7;

/// A decoded hub message.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    /// Call a method on the other side. No id means no completion is wanted.
    Invocation {
        invocation_id: Option<String>,
        target: String,
        arguments: Vec<Value>,
    },
    /// Outcome of an invocation that carried an id.
    Completion {
        invocation_id: String,
        result: Option<Value>,
        error: Option<String>,
    },
    /// Keepalive.
    Ping,
    /// The hub is ending the connection.
    Close {
        error: Option<String>,
        allow_reconnect: bool,
    },
    /// A message type the client does not act on (streaming, cancellation).
    Other(u8),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    invocation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    arguments: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allow_reconnect: Option<bool>,
}

#[derive(Serialize)]
struct HandshakeRequest {
    protocol: &'static str,
    version: u32,
}

#[derive(Deserialize)]
struct HandshakeResponse {
    error: Option<String>,
}

impl HubMessage {
    /// Decode one record (without its separator).
    pub fn decode(record: &str) -> Result<Self, ProtocolError> {
        let wire: WireMessage = serde_json::from_str(record)?;
        let kind = wire.kind;

        Ok(match kind {
            INVOCATION => Self::Invocation {
                invocation_id: wire.invocation_id,
                target: wire.target.ok_or(ProtocolError::MissingField { kind, field: "target" })?,
                arguments: wire.arguments.unwrap_or_default(),
            },
            COMPLETION => Self::Completion {
                invocation_id: wire
                    .invocation_id
                    .ok_or(ProtocolError::MissingField { kind, field: "invocationId" })?,
                result: wire.result,
                error: wire.error,
            },
            PING => Self::Ping,
            CLOSE => Self::Close {
                error: wire.error,
                allow_reconnect: wire.allow_reconnect.unwrap_or(false),
            },
            other => Self::Other(other),
        })
    }

    /// Encode as a record, including the trailing separator.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let wire = match self {
            Self::Invocation {
                invocation_id,
                target,
                arguments,
            } => WireMessage {
                kind: INVOCATION,
                invocation_id: invocation_id.clone(),
                target: Some(target.clone()),
                arguments: Some(arguments.clone()),
                ..Default::default()
            },
            Self::Completion {
                invocation_id,
                result,
                error,
            } => WireMessage {
                kind: COMPLETION,
                invocation_id: Some(invocation_id.clone()),
                result: result.clone(),
                error: error.clone(),
                ..Default::default()
            },
            Self::Ping => WireMessage {
                kind: PING,
                ..Default::default()
            },
            Self::Close {
                error,
                allow_reconnect,
            } => WireMessage {
                kind: CLOSE,
                error: error.clone(),
                allow_reconnect: Some(*allow_reconnect),
                ..Default::default()
            },
            Self::Other(kind) => WireMessage {
                kind: *kind,
                ..Default::default()
            },
        };

        let mut record = serde_json::to_string(&wire)?;
        record.push(RECORD_SEPARATOR);
        Ok(record)
    }
}

/// The handshake record the client sends first.
pub fn handshake_request() -> String {
    let request = HandshakeRequest {
        protocol: PROTOCOL_NAME,
        version: PROTOCOL_VERSION,
    };
    // A two-field struct of a str and an integer always serializes.
    let mut record = serde_json::to_string(&request).unwrap_or_default();
    record.push(RECORD_SEPARATOR);
    record
}

/// Check the hub's handshake reply (`{}` on success).
pub fn parse_handshake_response(record: &str) -> Result<(), ConnectionError> {
    let response: HandshakeResponse = serde_json::from_str(record)
        .map_err(|e| ConnectionError::Handshake(format!("unreadable response: {}", e)))?;

    match response.error {
        Some(error) => Err(ConnectionError::Handshake(error)),
        None => Ok(()),
    }
}

/// Splits incoming text into complete records.
///
/// Text after the last separator is kept until the rest of the record arrives.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: String,
}

impl FrameDecoder {
    /// Feed transport text and return every record it completes.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.buffer.push_str(text);

        let mut records = Vec::new();
        while let Some(pos) = self.buffer.find(RECORD_SEPARATOR) {
            let record: String = self.buffer.drain(..pos + RECORD_SEPARATOR.len_utf8()).collect();
            let record = &record[..pos];
            if !record.trim().is_empty() {
                records.push(record.to_string());
            }
        }
        records
    }

    /// Bytes held back waiting for a separator.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn handshake_request_format() {
        assert_eq!(handshake_request(), "{\"protocol\":\"json\",\"version\":1}\u{1e}");
    }

    #[test]
    fn handshake_response() {
        assert!(parse_handshake_response("{}").is_ok());

        let err = parse_handshake_response("{\"error\":\"unsupported protocol\"}").unwrap_err();
        assert_eq!(err.to_string(), "handshake failed: unsupported protocol");

        assert!(matches!(
            parse_handshake_response("not json"),
            Err(ConnectionError::Handshake(_))
        ));
    }

    #[test]
    fn decode_invocation() {
        let record = concat!(
            r#"{"type":1,"target":"NewQuestion","#,
            r#""arguments":[{"expression":"1 + 1 = ?","correctAnswer":2}]}"#,
        );
        let message = HubMessage::decode(record).unwrap();

        assert_eq!(
            message,
            HubMessage::Invocation {
                invocation_id: None,
                target: "NewQuestion".to_string(),
                arguments: vec![json!({"expression": "1 + 1 = ?", "correctAnswer": 2})],
            }
        );
    }

    #[test]
    fn decode_completion_and_close() {
        let message = HubMessage::decode(r#"{"type":3,"invocationId":"7","result":null}"#).unwrap();
        assert_eq!(
            message,
            HubMessage::Completion {
                invocation_id: "7".to_string(),
                result: None,
                error: None,
            }
        );

        let message =
            HubMessage::decode(r#"{"type":3,"invocationId":"8","error":"boom"}"#).unwrap();
        assert!(
            matches!(message, HubMessage::Completion { error: Some(ref e), .. } if e == "boom")
        );

        let message =
            HubMessage::decode(r#"{"type":7,"error":"bye","allowReconnect":true}"#).unwrap();
        assert_eq!(
            message,
            HubMessage::Close {
                error: Some("bye".to_string()),
                allow_reconnect: true,
            }
        );

        assert_eq!(HubMessage::decode(r#"{"type":6}"#).unwrap(), HubMessage::Ping);
        assert_eq!(
            HubMessage::decode(r#"{"type":2,"invocationId":"1","item":3}"#).unwrap(),
            HubMessage::Other(2)
        );
    }

    #[test]
    fn decode_rejects_missing_fields() {
        let err = HubMessage::decode(r#"{"type":1,"arguments":[]}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingField { kind: 1, field: "target" }));

        let err = HubMessage::decode(r#"{"type":3}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingField { kind: 3, field: "invocationId" }));

        assert!(matches!(HubMessage::decode("{"), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn encode_invocation_omits_absent_fields() {
        let message = HubMessage::Invocation {
            invocation_id: Some("0".to_string()),
            target: "SubmitAnswer".to_string(),
            arguments: vec![json!("Player"), json!(4.0), json!(4.0), json!(true)],
        };
        assert_eq!(
            message.encode().unwrap(),
            concat!(
                r#"{"type":1,"invocationId":"0","target":"SubmitAnswer","#,
                r#""arguments":["Player",4.0,4.0,true]}"#,
                "\u{1e}",
            )
        );

        assert_eq!(HubMessage::Ping.encode().unwrap(), "{\"type\":6}\u{1e}");
    }

    #[test]
    fn decoder_splits_batched_records() {
        let mut decoder = FrameDecoder::default();
        let records = decoder.push("{}\u{1e}{\"type\":6}\u{1e}");
        assert_eq!(records, vec!["{}".to_string(), "{\"type\":6}".to_string()]);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn decoder_holds_partial_records() {
        let mut decoder = FrameDecoder::default();
        assert!(decoder.push("{\"type\"").is_empty());
        assert_eq!(decoder.pending(), 7);

        let records = decoder.push(":6}\u{1e}{\"ty");
        assert_eq!(records, vec!["{\"type\":6}".to_string()]);
        assert_eq!(decoder.pending(), 4);
    }

    #[test]
    fn decoder_skips_empty_records() {
        let mut decoder = FrameDecoder::default();
        assert!(decoder.push("\u{1e}\u{1e}").is_empty());
    }
}
