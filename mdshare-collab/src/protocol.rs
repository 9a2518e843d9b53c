//! Relay wire protocol.
//!
//! Every frame is a WebSocket text message holding one JSON object with an
//! event name and a scalar payload:
//! ```text
//! {"event": "joinRoom",       "payload": "Alice"}      client → relay
//! {"event": "markdownChange", "payload": "# Notes"}    client → relay
//! {"event": "updateMarkdown", "payload": "# Notes"}    relay → client
//! {"event": "onlineUsers",    "payload": 3}            relay → client
//! ```
//!
//! Document content always travels as the full replacement string, never as a
//! delta.

use serde::{Deserialize, Serialize};

/// Direction a message is allowed to travel in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToRelay,
    RelayToClient,
}

/// One protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum RelayMessage {
    /// Request to join the shared room under a display name
    JoinRoom(String),
    /// Full replacement of the shared document, sent by an editing client
    MarkdownChange(String),
    /// Authoritative document content, applied unconditionally by clients
    UpdateMarkdown(String),
    /// Current participant count
    OnlineUsers(u64),
}

impl RelayMessage {
    pub fn join_room(display_name: impl Into<String>) -> Self {
        Self::JoinRoom(display_name.into())
    }

    pub fn markdown_change(content: impl Into<String>) -> Self {
        Self::MarkdownChange(content.into())
    }

    pub fn update_markdown(content: impl Into<String>) -> Self {
        Self::UpdateMarkdown(content.into())
    }

    pub fn online_users(count: u64) -> Self {
        Self::OnlineUsers(count)
    }

    /// Wire name of the event.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::JoinRoom(_) => "joinRoom",
            Self::MarkdownChange(_) => "markdownChange",
            Self::UpdateMarkdown(_) => "updateMarkdown",
            Self::OnlineUsers(_) => "onlineUsers",
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Self::JoinRoom(_) | Self::MarkdownChange(_) => Direction::ClientToRelay,
            Self::UpdateMarkdown(_) | Self::OnlineUsers(_) => Direction::RelayToClient,
        }
    }

    /// Serialize to a JSON text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    /// Parse a JSON text frame.
    ///
    /// Negative or fractional counts are rejected here, so a decoded
    /// `OnlineUsers` is always a non-negative integer.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(frame).map_err(ProtocolError::Decode)
    }
}

/// Protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Encode error: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Decode error: {0}")]
    Decode(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_variant() {
        let err = RelayMessage::decode("not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
        assert!(err.to_string().starts_with("Decode error: "));
    }

    #[test]
    fn test_join_room_wire_format() {
        let encoded = RelayMessage::join_room("Alice").encode().unwrap();
        assert_eq!(encoded, r#"{"event":"joinRoom","payload":"Alice"}"#);
    }

    #[test]
    fn test_online_users_wire_format() {
        let encoded = RelayMessage::online_users(3).encode().unwrap();
        assert_eq!(encoded, r#"{"event":"onlineUsers","payload":3}"#);
    }

    #[test]
    fn test_decode_update_markdown() {
        let frame = r##"{"event":"updateMarkdown","payload":"# Title\n\nbody"}"##;
        let msg = RelayMessage::decode(frame).unwrap();
        assert_eq!(msg, RelayMessage::update_markdown("# Title\n\nbody"));
        assert_eq!(msg.direction(), Direction::RelayToClient);
    }

    #[test]
    fn test_markdown_change_keeps_full_content() {
        let content = "line one\n".repeat(2_000);
        let msg = RelayMessage::markdown_change(content.clone());
        let decoded = RelayMessage::decode(&msg.encode().unwrap()).unwrap();
        assert_eq!(decoded, RelayMessage::MarkdownChange(content));
    }

    #[test]
    fn test_empty_document_is_valid_payload() {
        let msg = RelayMessage::decode(r#"{"event":"updateMarkdown","payload":""}"#).unwrap();
        assert_eq!(msg, RelayMessage::UpdateMarkdown(String::new()));
    }

    #[test]
    fn test_negative_count_rejected() {
        let result = RelayMessage::decode(r#"{"event":"onlineUsers","payload":-1}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_unknown_event_rejected() {
        assert!(RelayMessage::decode(r#"{"event":"cursorMove","payload":1}"#).is_err());
        assert!(RelayMessage::decode("not json").is_err());
    }

    #[test]
    fn test_event_names_and_directions() {
        let join = RelayMessage::join_room("x");
        let change = RelayMessage::markdown_change("x");
        assert_eq!(join.event_name(), "joinRoom");
        assert_eq!(change.event_name(), "markdownChange");
        assert_eq!(join.direction(), Direction::ClientToRelay);
        assert_eq!(change.direction(), Direction::ClientToRelay);
        assert_eq!(RelayMessage::online_users(0).event_name(), "onlineUsers");
    }
}
