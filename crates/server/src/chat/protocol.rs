//! Chat wire protocol
//!
//! Every WebSocket text frame is a JSON object `{"event": <name>, "data": <payload>}`.
//!
//! ```text
//! server -> client   {"event":"update","data":{"user_name":"alice","message":"hi"}}
//! server -> client   {"event":"message","data":"OK"}
//! client -> server   {"event":"message","data":{"user_name":"alice","message":"hi"}}
//! client -> server   {"event":"clear history"}
//! ```

use crate::models::ChatMessage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const EVENT_MESSAGE: &str = "message";
pub const EVENT_CLEAR_HISTORY: &str = "clear history";

/// Events pushed from the server to a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// A chat entry, from replay or from a broadcast
    #[serde(rename = "update")]
    Update(ChatMessage),
    /// Plain-text unicast, used for the bot reply
    #[serde(rename = "message")]
    Message(String),
}

impl ServerEvent {
    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Inbound events the session state machine reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    UserMessage(ChatMessage),
    ClearHistory,
    Disconnect,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame is not a JSON event: {0}")]
    MalformedFrame(#[source] serde_json::Error),
    #[error("invalid payload for '{event}': {source}")]
    InvalidPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Decode one client text frame.
///
/// Returns `Ok(None)` for event names this server has no handler for.
pub fn parse_client_frame(text: &str) -> Result<Option<SessionEvent>, ProtocolError> {
    let frame: RawFrame = serde_json::from_str(text).map_err(ProtocolError::MalformedFrame)?;

    match frame.event.as_str() {
        EVENT_MESSAGE => {
            let message: ChatMessage = serde_json::from_value(frame.data).map_err(|source| {
                ProtocolError::InvalidPayload {
                    event: frame.event.clone(),
                    source,
                }
            })?;
            Ok(Some(SessionEvent::UserMessage(message)))
        }
        EVENT_CLEAR_HISTORY => Ok(Some(SessionEvent::ClearHistory)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_frame_shape() {
        let frame = ServerEvent::Update(ChatMessage::new("alice", "hi"))
            .to_frame()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            value,
            json!({"event": "update", "data": {"user_name": "alice", "message": "hi"}})
        );
    }

    #[test]
    fn test_reply_frame_is_plain_text() {
        let frame = ServerEvent::Message("OK".to_string()).to_frame().unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value, json!({"event": "message", "data": "OK"}));
    }

    #[test]
    fn test_parse_user_message() {
        let event = parse_client_frame(
            r#"{"event":"message","data":{"user_name":"alice","message":"hi"}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            Some(SessionEvent::UserMessage(ChatMessage::new("alice", "hi")))
        );
    }

    #[test]
    fn test_clear_history_payload_is_optional() {
        assert_eq!(
            parse_client_frame(r#"{"event":"clear history"}"#).unwrap(),
            Some(SessionEvent::ClearHistory)
        );
        assert_eq!(
            parse_client_frame(r#"{"event":"clear history","data":{"anything":1}}"#).unwrap(),
            Some(SessionEvent::ClearHistory)
        );
    }

    #[test]
    fn test_unknown_event_is_ignored() {
        assert_eq!(parse_client_frame(r#"{"event":"typing"}"#).unwrap(), None);
    }

    #[test]
    fn test_bad_frames_are_errors() {
        assert!(matches!(
            parse_client_frame("not json"),
            Err(ProtocolError::MalformedFrame(_))
        ));
        assert!(matches!(
            parse_client_frame(r#"{"event":"message","data":"hi"}"#),
            Err(ProtocolError::InvalidPayload { .. })
        ));
    }
}
