//! The three Warudo button kinds and their per-button settings.

use serde::Deserialize;

/// Kind of a Warudo button. All three kinds share one appear/disappear/press
/// path and differ only by this tag, attached when the host reports the
/// button's action UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Trigger,
    Toggle,
    Message,
}

impl ActionKind {
    /// Map a host action UUID to a button kind.
    pub fn from_uuid(uuid: &str) -> Option<Self> {
        match uuid {
            "warudo.trigger" => Some(ActionKind::Trigger),
            "warudo.toggle" => Some(ActionKind::Toggle),
            "warudo.message" => Some(ActionKind::Message),
            _ => None,
        }
    }

    /// The `action` tag this kind carries on the Warudo wire.
    pub fn wire_tag(&self) -> &'static str {
        match self {
            ActionKind::Trigger => "trigger",
            ActionKind::Toggle => "toggle",
            ActionKind::Message => "message",
        }
    }
}

/// Per-button configuration as delivered by the host's settings round-trip.
/// Both fields are optional; a freshly placed button has neither.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonSettings {
    #[serde(default)]
    pub receiver_name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
