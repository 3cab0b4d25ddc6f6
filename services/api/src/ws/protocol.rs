//! Defines the WebSocket message protocol between realtime clients and the API server.
//!
//! Bus events are forwarded verbatim as `{type, timestamp, sessionId, payload}`
//! envelopes; the messages below are the control frames around them.

use serde::{Deserialize, Serialize};

/// Commands sent from the client to the server.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ClientCommand {
    /// Joins one session's room, leaving any previous one.
    #[serde(rename = "subscribe", rename_all = "camelCase")]
    Subscribe { session_id: String },
    #[serde(rename = "unsubscribe", rename_all = "camelCase")]
    Unsubscribe { session_id: String },
    #[serde(rename = "ping")]
    Ping,
    /// Supervised channel only. Queued as a hint for the session's next turn.
    #[serde(rename = "supervisor.whisper", rename_all = "camelCase")]
    SupervisorWhisper { session_id: String, hint_text: String },
}

/// Control messages sent from the server to the client.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Connected { channel: String },
    Subscribed { session_id: String },
    Unsubscribed { session_id: String },
    Pong,
    HintQueued { session_id: String, queued: usize },
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_whisper_command_parses() {
        let command: ClientCommand = serde_json::from_value(json!({
            "type": "supervisor.whisper",
            "sessionId": "abc",
            "hintText": "ask Ben"
        }))
        .unwrap();
        assert_eq!(
            command,
            ClientCommand::SupervisorWhisper {
                session_id: "abc".into(),
                hint_text: "ask Ben".into()
            }
        );
    }

    #[test]
    fn test_ping_and_unknown_commands() {
        let ping: ClientCommand = serde_json::from_value(json!({ "type": "ping" })).unwrap();
        assert_eq!(ping, ClientCommand::Ping);
        assert!(serde_json::from_value::<ClientCommand>(json!({ "type": "shout" })).is_err());
    }

    #[test]
    fn test_server_messages_use_camel_case_fields() {
        let value = serde_json::to_value(ServerMessage::HintQueued {
            session_id: "abc".into(),
            queued: 2,
        })
        .unwrap();
        assert_eq!(value, json!({ "type": "hint_queued", "sessionId": "abc", "queued": 2 }));
        let pong = serde_json::to_value(ServerMessage::Pong).unwrap();
        assert_eq!(pong, json!({ "type": "pong" }));
    }
}
