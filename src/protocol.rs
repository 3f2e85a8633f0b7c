//! Warudo wire format.
//!
//! Both directions carry JSON objects with an `action` tag and a `data`
//! payload. Outbound frames are built with `json!`; inbound frames
//! deserialize into a tagged enum whose `Unknown` arm swallows every
//! unhandled kind.

use crate::actions::ActionKind;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Frames the plugin sends to Warudo.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    /// Full toggle-state snapshot request, sent right after connecting.
    SnapshotRequest,
    /// Receiver-list request forwarded from the property inspector, tagged
    /// with the requested receiver type.
    ReceiverListRequest { receiver_type: String },
    /// A key press on one of the three button kinds. `receiver_name` is
    /// omitted from the wire while no settings have been stored; `message`
    /// is always present for message-kind presses.
    KeyPress {
        kind: ActionKind,
        receiver_name: Option<String>,
        message: Option<String>,
    },
}

impl OutboundMessage {
    pub fn to_json(&self) -> Value {
        match self {
            OutboundMessage::SnapshotRequest => json!({"action": "getToggles"}),
            OutboundMessage::ReceiverListRequest { receiver_type } => {
                json!({"action": "getReceivers", "data": {"type": receiver_type}})
            }
            OutboundMessage::KeyPress {
                kind,
                receiver_name,
                message,
            } => {
                let mut data = Map::new();
                if let Some(name) = receiver_name {
                    data.insert("receiverName".to_string(), Value::String(name.clone()));
                }
                if let Some(text) = message {
                    data.insert("message".to_string(), Value::String(text.clone()));
                }
                json!({"action": kind.wire_tag(), "data": data})
            }
        }
    }
}

/// A single toggle update pushed by Warudo. `isResponse` marks replies to our
/// own toggle presses and suppresses the visual refresh pass.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleUpdate {
    pub receiver_name: String,
    pub state: bool,
    #[serde(default)]
    pub is_response: bool,
}

/// Frames Warudo sends to the plugin. Exactly three kinds are handled;
/// any other action tag lands on `Unknown`, payload or not, and is
/// silently ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerMessage {
    /// Current receiver list, forwarded opaquely to property inspectors.
    ReceiverList(Vec<Value>),
    ToggleUpdate(ToggleUpdate),
    /// Full receiver-to-state snapshot.
    ToggleSnapshot(HashMap<String, bool>),
    Unknown,
}

// A tagged derive rejects unknown tags that carry a `data` payload; the
// envelope is matched by hand so those frames land on `Unknown`.
impl<'de> Deserialize<'de> for PeerMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Frame {
            action: String,
            #[serde(default)]
            data: Value,
        }

        let frame = Frame::deserialize(deserializer)?;
        match frame.action.as_str() {
            "getReceivers" => serde_json::from_value(frame.data)
                .map(PeerMessage::ReceiverList)
                .map_err(de::Error::custom),
            "toggle" => serde_json::from_value(frame.data)
                .map(PeerMessage::ToggleUpdate)
                .map_err(de::Error::custom),
            "getToggles" => serde_json::from_value(frame.data)
                .map(PeerMessage::ToggleSnapshot)
                .map_err(de::Error::custom),
            _ => Ok(PeerMessage::Unknown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_request_has_no_data() {
        assert_eq!(
            OutboundMessage::SnapshotRequest.to_json(),
            json!({"action": "getToggles"})
        );
    }

    #[test]
    fn receiver_list_request_carries_type() {
        let frame = OutboundMessage::ReceiverListRequest {
            receiver_type: "streamdeck".to_string(),
        };
        assert_eq!(
            frame.to_json(),
            json!({"action": "getReceivers", "data": {"type": "streamdeck"}})
        );
    }

    #[test]
    fn key_press_omits_unset_receiver_name() {
        let frame = OutboundMessage::KeyPress {
            kind: ActionKind::Trigger,
            receiver_name: None,
            message: None,
        };
        assert_eq!(frame.to_json(), json!({"action": "trigger", "data": {}}));
    }

    #[test]
    fn message_press_keeps_empty_message_field() {
        let frame = OutboundMessage::KeyPress {
            kind: ActionKind::Message,
            receiver_name: Some("Chat".to_string()),
            message: Some(String::new()),
        };
        assert_eq!(
            frame.to_json(),
            json!({"action": "message", "data": {"receiverName": "Chat", "message": ""}})
        );
    }

    #[test]
    fn parses_toggle_update_and_defaults_is_response() {
        let message: PeerMessage = serde_json::from_str(
            r#"{"action": "toggle", "data": {"receiverName": "A", "state": false}}"#,
        )
        .unwrap();
        assert_eq!(
            message,
            PeerMessage::ToggleUpdate(ToggleUpdate {
                receiver_name: "A".to_string(),
                state: false,
                is_response: false,
            })
        );

        let message: PeerMessage = serde_json::from_str(
            r#"{"action": "toggle", "data": {"receiverName": "A", "state": true, "isResponse": true}}"#,
        )
        .unwrap();
        assert_eq!(
            message,
            PeerMessage::ToggleUpdate(ToggleUpdate {
                receiver_name: "A".to_string(),
                state: true,
                is_response: true,
            })
        );
    }

    #[test]
    fn parses_toggle_snapshot() {
        let message: PeerMessage =
            serde_json::from_str(r#"{"action": "getToggles", "data": {"A": true, "B": false}}"#)
                .unwrap();
        let PeerMessage::ToggleSnapshot(states) = message else {
            panic!("expected snapshot");
        };
        assert_eq!(states.get("A"), Some(&true));
        assert_eq!(states.get("B"), Some(&false));
    }

    #[test]
    fn parses_receiver_list() {
        let message: PeerMessage = serde_json::from_str(
            r#"{"action": "getReceivers", "data": [{"name": "Wave"}, {"name": "Dance"}]}"#,
        )
        .unwrap();
        let PeerMessage::ReceiverList(receivers) = message else {
            panic!("expected receiver list");
        };
        assert_eq!(receivers.len(), 2);
    }

    #[test]
    fn unknown_action_tags_are_ignored() {
        // With a payload object.
        let message: PeerMessage =
            serde_json::from_str(r#"{"action": "somethingNew", "data": {"x": 1}}"#).unwrap();
        assert_eq!(message, PeerMessage::Unknown);

        // Without any payload.
        let message: PeerMessage = serde_json::from_str(r#"{"action": "ping"}"#).unwrap();
        assert_eq!(message, PeerMessage::Unknown);
    }

    #[test]
    fn malformed_frames_fail_to_parse() {
        assert!(serde_json::from_str::<PeerMessage>("not json").is_err());
        assert!(serde_json::from_str::<PeerMessage>(
            r#"{"action": "toggle", "data": {"state": true}}"#
        )
        .is_err());
    }
}
