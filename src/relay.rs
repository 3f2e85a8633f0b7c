//! Event relay: the single dispatch point between the host runtime, the
//! Warudo link, and the plugin state.
//!
//! Every host event, peer message, and link transition flows through
//! [`handle_event`]; the main loop owns `PluginState` exclusively and passes
//! it in, so handlers never touch shared or ambient state.

use crate::actions::ActionKind;
use crate::host::{HostEvent, HostHandle};
use crate::indicator::Indicator;
use crate::protocol::{OutboundMessage, PeerMessage};
use crate::state::{PendingAction, PluginState};
use crate::warudo::PeerLink;
use anyhow::Result;
use serde_json::json;

/// Everything the main loop reacts to, merged into one channel.
#[derive(Debug)]
pub enum Event {
    Host(HostEvent),
    Peer(PeerMessage),
    /// Warudo socket opened.
    LinkUp,
    /// Warudo socket closed.
    LinkDown,
    /// Host socket closed; the host owns the plugin lifecycle.
    Shutdown,
}

pub fn handle_event(
    state: &mut PluginState,
    host: &dyn HostHandle,
    link: &dyn PeerLink,
    indicator: &mut Indicator,
    event: Event,
) -> Result<()> {
    match event {
        Event::Host(event) => handle_host_event(state, host, link, indicator, event),
        Event::Peer(message) => handle_peer_message(state, host, message),
        Event::LinkUp => {
            // Stored toggle state is stale across reconnects; drop it before
            // asking for a fresh snapshot.
            state.clear_toggle_states();
            link.send(&OutboundMessage::SnapshotRequest)
        }
        Event::LinkDown => host.log_message("Disconnected from Warudo"),
        Event::Shutdown => Ok(()),
    }
}

fn handle_host_event(
    state: &mut PluginState,
    host: &dyn HostHandle,
    link: &dyn PeerLink,
    indicator: &mut Indicator,
    event: HostEvent,
) -> Result<()> {
    match event {
        HostEvent::WillAppear { action, context } => {
            if let Some(kind) = ActionKind::from_uuid(&action) {
                state.register(context, kind);
            }
            Ok(())
        }
        HostEvent::WillDisappear { context, .. } => {
            state.unregister(&context);
            Ok(())
        }
        HostEvent::KeyDown { context, .. } => {
            // Settings only arrive via an asynchronous host round-trip; park
            // the press until they do.
            state.set_pending(&context, PendingAction::Press);
            host.get_settings(&context)
        }
        HostEvent::KeyUp { .. } => Ok(()),
        HostEvent::DidReceiveSettings { context, payload } => {
            state.set_settings(&context, &payload.settings);
            match state.take_pending(&context) {
                Some(PendingAction::Press) => run_press(state, host, link, &context),
                Some(PendingAction::Refresh) => apply_toggle_visual(state, host, &context),
                None => Ok(()),
            }
        }
        HostEvent::PropertyInspectorDidAppear { context } => {
            host.send_to_property_inspector(&context, json!({"receivers": state.receivers()}))
        }
        HostEvent::PropertyInspectorDidDisappear { .. } => Ok(()),
        HostEvent::SendToPlugin { payload, .. } => {
            if let Some(receiver_type) = payload.get("getReceivers").and_then(|v| v.as_str()) {
                link.send(&OutboundMessage::ReceiverListRequest {
                    receiver_type: receiver_type.to_string(),
                })?;
            }
            // Every inspector message kicks a visual refresh.
            request_toggle_refresh(state, host)
        }
        HostEvent::ApplicationDidLaunch { payload } => {
            link.resume();
            indicator.on_launch(state, host, &payload.application)
        }
        HostEvent::ApplicationDidTerminate { payload } => {
            link.suspend();
            indicator.on_terminate(state, host, &payload.application)
        }
        HostEvent::Unknown => Ok(()),
    }
}

fn handle_peer_message(
    state: &mut PluginState,
    host: &dyn HostHandle,
    message: PeerMessage,
) -> Result<()> {
    match message {
        PeerMessage::ReceiverList(receivers) => {
            state.set_receivers(receivers);
            let payload = json!({"receivers": state.receivers()});
            for context in state.contexts_vec() {
                host.send_to_property_inspector(&context, payload.clone())?;
            }
            Ok(())
        }
        PeerMessage::ToggleUpdate(update) => {
            state.set_toggle_state(&update.receiver_name, update.state);
            // Replies to our own presses skip the refresh pass.
            if update.is_response {
                Ok(())
            } else {
                request_toggle_refresh(state, host)
            }
        }
        PeerMessage::ToggleSnapshot(states) => {
            state.replace_toggle_states(states);
            request_toggle_refresh(state, host)
        }
        PeerMessage::Unknown => Ok(()),
    }
}

/// Kick a settings round-trip for every toggle context; visuals update when
/// the settings come back (`PendingAction::Refresh`). Also runs on the
/// fixed refresh interval from the main loop.
pub fn request_toggle_refresh(state: &mut PluginState, host: &dyn HostHandle) -> Result<()> {
    for context in state.toggle_contexts_vec() {
        state.set_pending(&context, PendingAction::Refresh);
        host.get_settings(&context)?;
    }
    Ok(())
}

/// Run a parked press now that settings are in. The whole path is guarded:
/// any failure surfaces as the key's alert indicator, never as a crash.
fn run_press(
    state: &mut PluginState,
    host: &dyn HostHandle,
    link: &dyn PeerLink,
    context: &str,
) -> Result<()> {
    let Some(kind) = state.kind(context) else {
        return Ok(());
    };

    if !link.is_open() {
        return host.show_alert(context);
    }

    let message = match kind {
        // Empty string on the wire, never an absent field.
        ActionKind::Message => Some(state.message(context).unwrap_or_default().to_string()),
        _ => None,
    };
    let frame = OutboundMessage::KeyPress {
        kind,
        receiver_name: state.receiver_name(context).map(str::to_string),
        message,
    };

    match link.send(&frame) {
        Ok(()) => host.show_ok(context),
        Err(e) => {
            eprintln!("Press send failed: {e:#}");
            host.show_alert(context)
        }
    }
}

fn apply_toggle_visual(state: &PluginState, host: &dyn HostHandle, context: &str) -> Result<()> {
    let on = state
        .receiver_name(context)
        .map(|receiver| state.toggle_state(receiver))
        .unwrap_or(false);
    host.set_state(context, if on { 1 } else { 0 })
}
