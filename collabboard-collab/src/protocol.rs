//! JSON event protocol spoken over WebSocket text frames.
//!
//! Wire format:
//! ```text
//! { "event": "<kebab-case name>", "data": <payload> }
//! ```
//!
//! | direction        | event         | data               |
//! |------------------|---------------|--------------------|
//! | client -> server | `join-room`   | `"roomId"`         |
//! | client -> server | `draw`        | `{roomId, action}` |
//! | client -> server | `clear-board` | `"roomId"`         |
//! | server -> client | `load-board`  | `[action, ...]`    |
//! | server -> client | `draw`        | `action`           |
//! | server -> client | `clear-board` | (absent)           |

use collabboard_core::StrokeSegment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Payload of a client `draw` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawRequest {
    pub room_id: String,
    pub action: StrokeSegment,
}

/// Events sent by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    JoinRoom(String),
    Draw(DrawRequest),
    ClearBoard(String),
}

impl ClientEvent {
    pub fn join_room(room_id: impl Into<String>) -> Self {
        Self::JoinRoom(room_id.into())
    }

    pub fn draw(room_id: impl Into<String>, action: StrokeSegment) -> Self {
        Self::Draw(DrawRequest {
            room_id: room_id.into(),
            action,
        })
    }

    pub fn clear_board(room_id: impl Into<String>) -> Self {
        Self::ClearBoard(room_id.into())
    }

    /// The room this event targets.
    pub fn room_id(&self) -> &str {
        match self {
            Self::JoinRoom(room_id) | Self::ClearBoard(room_id) => room_id,
            Self::Draw(req) => &req.room_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom(_) => "join-room",
            Self::Draw(_) => "draw",
            Self::ClearBoard(_) => "clear-board",
        }
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }
}

/// Events sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Full history of a room, sent to a joining connection only
    LoadBoard(Vec<StrokeSegment>),
    /// A segment drawn by another connection
    Draw(StrokeSegment),
    /// The board was wiped
    ClearBoard,
}

impl ServerEvent {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }
}

/// Protocol errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Deserialization error: {0}")]
    Deserialization(String),
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Offline queue is full")]
    OfflineQueueFull,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn segment() -> StrokeSegment {
        StrokeSegment::new((10.0, 10.0), (12.0, 14.0), "#4f46e5", 4.0)
    }

    #[test]
    fn test_decode_join_room() {
        let event = ClientEvent::decode(r#"{"event":"join-room","data":"default"}"#).unwrap();
        assert_eq!(event, ClientEvent::join_room("default"));
        assert_eq!(event.room_id(), "default");
        assert_eq!(event.name(), "join-room");
    }

    #[test]
    fn test_decode_draw_from_browser() {
        let raw = r##"{"event":"draw","data":{"roomId":"r1","action":
            {"fromX":10,"fromY":10,"toX":12,"toY":14,"color":"#4f46e5","size":4}}}"##;
        let event = ClientEvent::decode(raw).unwrap();

        assert_eq!(event, ClientEvent::draw("r1", segment()));
        assert_eq!(event.room_id(), "r1");
    }

    #[test]
    fn test_decode_clear_board() {
        let event = ClientEvent::decode(r#"{"event":"clear-board","data":"r1"}"#).unwrap();
        assert_eq!(event, ClientEvent::clear_board("r1"));
    }

    #[test]
    fn test_client_draw_wire_shape() {
        let encoded = ClientEvent::draw("r1", segment()).encode().unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();

        assert_eq!(value["event"], "draw");
        assert_eq!(value["data"]["roomId"], "r1");
        assert_eq!(value["data"]["action"]["toY"], 14.0);
    }

    #[test]
    fn test_server_clear_board_has_no_data() {
        let encoded = ServerEvent::ClearBoard.encode().unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value, json!({ "event": "clear-board" }));
    }

    #[test]
    fn test_server_load_board_wire_shape() {
        let encoded = ServerEvent::LoadBoard(vec![segment(), segment()]).encode().unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();

        assert_eq!(value["event"], "load-board");
        let actions = value["data"].as_array().unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0]["fromX"], 10.0);
    }

    #[test]
    fn test_server_draw_carries_bare_action() {
        let encoded = ServerEvent::Draw(segment()).encode().unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["event"], "draw");
        assert_eq!(value["data"]["color"], "#4f46e5");
        assert!(value["data"].get("roomId").is_none());
    }

    #[test]
    fn test_unknown_event_rejected() {
        let result = ClientEvent::decode(r#"{"event":"erase-everything","data":"r1"}"#);
        assert!(matches!(result, Err(ProtocolError::Deserialization(_))));
    }

    #[test]
    fn test_draw_without_action_rejected() {
        assert!(ClientEvent::decode(r#"{"event":"draw","data":{"roomId":"r1"}}"#).is_err());
    }

    #[test]
    fn test_decode_garbage() {
        assert!(ClientEvent::decode("not json").is_err());
        assert!(ServerEvent::decode("{}").is_err());
    }
}
