//! In-memory plugin state.
//!
//! One `PluginState` instance is owned exclusively by the main event loop and
//! passed into handler functions; nothing here is shared across threads.

use crate::actions::{ActionKind, ButtonSettings};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Host-assigned opaque identifier for one visible button instance.
pub type ContextId = String;

/// Deferred work waiting on a settings round-trip. One slot per context;
/// the last writer wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    /// A key press waiting for its receiver name.
    Press,
    /// A toggle-visual refresh waiting for its receiver name.
    Refresh,
}

#[derive(Debug, Default)]
pub struct PluginState {
    /// Every visible button context, any kind.
    active: HashSet<ContextId>,
    /// Toggle-kind contexts, kept separately for the refresh pass.
    toggle_contexts: HashSet<ContextId>,
    /// Button kind per context, tagged at appear time.
    kinds: HashMap<ContextId, ActionKind>,
    /// context -> receiver name, from host-delivered settings.
    receiver_names: HashMap<ContextId, String>,
    /// context -> message text, message-kind buttons only.
    messages: HashMap<ContextId, String>,
    /// receiver name -> last known on/off state mirrored from Warudo.
    /// Keyed by receiver, not context: multiple buttons may share a receiver.
    toggle_states: HashMap<String, bool>,
    /// Last receiver list from Warudo, forwarded opaquely to inspectors.
    receivers: Vec<Value>,
    /// Monitored applications currently running.
    running_apps: Vec<String>,
    /// Single-slot pending action per context.
    pending: HashMap<ContextId, PendingAction>,
    /// When to revert key images after a terminated-overlay flash.
    revert_images_at: Option<Instant>,
}

impl PluginState {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Context lifecycle ────────────────────────────────────────────

    pub fn register(&mut self, context: ContextId, kind: ActionKind) {
        if kind == ActionKind::Toggle {
            self.toggle_contexts.insert(context.clone());
        }
        self.kinds.insert(context.clone(), kind);
        self.active.insert(context);
    }

    pub fn unregister(&mut self, context: &str) {
        self.active.remove(context);
        self.toggle_contexts.remove(context);
        self.kinds.remove(context);
        self.receiver_names.remove(context);
        self.messages.remove(context);
        self.pending.remove(context);
    }

    pub fn is_active(&self, context: &str) -> bool {
        self.active.contains(context)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Snapshot of all active contexts, so handlers can mutate state while
    /// walking the list.
    pub fn contexts_vec(&self) -> Vec<ContextId> {
        self.active.iter().cloned().collect()
    }

    pub fn toggle_contexts_vec(&self) -> Vec<ContextId> {
        self.toggle_contexts.iter().cloned().collect()
    }

    pub fn kind(&self, context: &str) -> Option<ActionKind> {
        self.kinds.get(context).copied()
    }

    // ── Settings ─────────────────────────────────────────────────────

    pub fn set_settings(&mut self, context: &str, settings: &ButtonSettings) {
        match &settings.receiver_name {
            Some(name) => {
                self.receiver_names.insert(context.to_string(), name.clone());
            }
            None => {
                self.receiver_names.remove(context);
            }
        }
        match &settings.message {
            Some(text) => {
                self.messages.insert(context.to_string(), text.clone());
            }
            None => {
                self.messages.remove(context);
            }
        }
    }

    pub fn receiver_name(&self, context: &str) -> Option<&str> {
        self.receiver_names.get(context).map(String::as_str)
    }

    pub fn message(&self, context: &str) -> Option<&str> {
        self.messages.get(context).map(String::as_str)
    }

    // ── Toggle state mirror ──────────────────────────────────────────

    pub fn set_toggle_state(&mut self, receiver: &str, state: bool) {
        self.toggle_states.insert(receiver.to_string(), state);
    }

    /// Unknown receivers read as off.
    pub fn toggle_state(&self, receiver: &str) -> bool {
        self.toggle_states.get(receiver).copied().unwrap_or(false)
    }

    pub fn replace_toggle_states(&mut self, states: HashMap<String, bool>) {
        self.toggle_states = states;
    }

    pub fn clear_toggle_states(&mut self) {
        self.toggle_states.clear();
    }

    pub fn toggle_states(&self) -> &HashMap<String, bool> {
        &self.toggle_states
    }

    // ── Receiver list ────────────────────────────────────────────────

    pub fn set_receivers(&mut self, receivers: Vec<Value>) {
        self.receivers = receivers;
    }

    pub fn receivers(&self) -> &[Value] {
        &self.receivers
    }

    // ── Pending actions ──────────────────────────────────────────────

    pub fn set_pending(&mut self, context: &str, action: PendingAction) {
        self.pending.insert(context.to_string(), action);
    }

    pub fn take_pending(&mut self, context: &str) -> Option<PendingAction> {
        self.pending.remove(context)
    }

    #[cfg(test)]
    pub fn pending(&self, context: &str) -> Option<PendingAction> {
        self.pending.get(context).copied()
    }

    // ── Running apps ─────────────────────────────────────────────────

    pub fn add_running_app(&mut self, app: String) {
        if !self.running_apps.contains(&app) {
            self.running_apps.push(app);
        }
    }

    pub fn remove_running_app(&mut self, app: &str) {
        self.running_apps.retain(|a| a != app);
    }

    pub fn running_apps(&self) -> &[String] {
        &self.running_apps
    }

    // ── Image revert timer ───────────────────────────────────────────

    pub fn schedule_image_revert(&mut self, at: Instant) {
        self.revert_images_at = Some(at);
    }

    pub fn clear_image_revert(&mut self) {
        self.revert_images_at = None;
    }

    pub fn revert_due(&self, now: Instant) -> bool {
        self.revert_images_at.is_some_and(|at| now >= at)
    }
}
