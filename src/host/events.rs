//! Events delivered by the Stream Deck host runtime.
//!
//! The host frames every event as a JSON object with an `event` tag; the
//! variants below cover the lifecycle the plugin reacts to and everything
//! else deserializes to `Unknown`.

use crate::actions::ButtonSettings;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SettingsPayload {
    #[serde(default)]
    pub settings: ButtonSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApplicationPayload {
    pub application: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HostEvent {
    WillAppear {
        action: String,
        context: String,
    },
    WillDisappear {
        action: String,
        context: String,
    },
    KeyDown {
        action: String,
        context: String,
    },
    KeyUp {
        action: String,
        context: String,
    },
    DidReceiveSettings {
        context: String,
        payload: SettingsPayload,
    },
    PropertyInspectorDidAppear {
        context: String,
    },
    PropertyInspectorDidDisappear {
        context: String,
    },
    /// Payload from the property inspector; shape is inspector-defined.
    SendToPlugin {
        context: String,
        payload: Value,
    },
    ApplicationDidLaunch {
        payload: ApplicationPayload,
    },
    ApplicationDidTerminate {
        payload: ApplicationPayload,
    },
    #[serde(other)]
    Unknown,
}
