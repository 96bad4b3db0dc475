//! JSON serialization for WebSocket frames.

use super::types::{ClientMessage, ServerMessage};

/// Serialize a server frame.
pub fn serialize_outbound(msg: &ServerMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}

/// Deserialize a client frame.
pub fn deserialize_inbound(text: &str) -> Result<ClientMessage, serde_json::Error> {
    serde_json::from_str(text)
}

/// Serialize a client frame.
pub fn serialize_inbound(msg: &ClientMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}

/// Deserialize a server frame.
pub fn deserialize_outbound(text: &str) -> Result<ServerMessage, serde_json::Error> {
    serde_json::from_str(text)
}
