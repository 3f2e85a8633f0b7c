//! Host socket client.
//!
//! The plugin registers on the host's local WebSocket and calls back into
//! host operations by framing JSON commands onto it. `HostHandle` is the
//! seam: one method per host operation, so relay logic can run against a
//! recording double in tests.

use crate::launch::LaunchArgs;
use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::net::TcpStream;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{connect, Message, WebSocket};

pub type HostSocket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Poll interval for host socket reads; writers interleave between polls.
pub const HOST_READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Operations the host runtime provides back to the plugin.
pub trait HostHandle {
    /// Switch a key between its configured visual states (0 = off, 1 = on).
    fn set_state(&self, context: &str, state: u8) -> Result<()>;
    /// Show an image on a key; accepts a path or a base64 data URI.
    fn set_image(&self, context: &str, image: &str) -> Result<()>;
    /// Flash the success checkmark on a key.
    fn show_ok(&self, context: &str) -> Result<()>;
    /// Flash the warning triangle on a key.
    fn show_alert(&self, context: &str) -> Result<()>;
    /// Ask the host to deliver the context's settings (answered
    /// asynchronously with a `didReceiveSettings` event).
    fn get_settings(&self, context: &str) -> Result<()>;
    /// Forward a payload to the context's property inspector.
    fn send_to_property_inspector(&self, context: &str, payload: Value) -> Result<()>;
    /// Write a line to the host's debug log.
    fn log_message(&self, message: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct HostClient {
    socket: Arc<Mutex<HostSocket>>,
}

impl HostClient {
    /// Connect to the host socket and perform the registration handshake.
    pub fn connect(args: &LaunchArgs) -> Result<Self> {
        let url = format!("ws://127.0.0.1:{}", args.port);
        let (mut socket, _response) =
            connect(&url).context("Failed to connect to Stream Deck host")?;

        if let MaybeTlsStream::Plain(stream) = socket.get_ref() {
            stream
                .set_read_timeout(Some(HOST_READ_TIMEOUT))
                .context("Failed to set host socket read timeout")?;
        }

        let frame = json!({"event": args.register_event, "uuid": args.plugin_uuid});
        socket
            .send(Message::Text(frame.to_string()))
            .context("Failed to register with Stream Deck host")?;

        Ok(Self {
            socket: Arc::new(Mutex::new(socket)),
        })
    }

    /// Shared handle to the socket for the reader thread.
    pub fn socket(&self) -> Arc<Mutex<HostSocket>> {
        Arc::clone(&self.socket)
    }

    fn send_frame(&self, frame: Value) -> Result<()> {
        let mut socket = self.socket.lock().unwrap_or_else(|e| e.into_inner());
        socket
            .send(Message::Text(frame.to_string()))
            .context("Failed to send command to Stream Deck host")
    }
}

impl HostHandle for HostClient {
    fn set_state(&self, context: &str, state: u8) -> Result<()> {
        self.send_frame(json!({
            "event": "setState",
            "context": context,
            "payload": {"state": state}
        }))
    }

    fn set_image(&self, context: &str, image: &str) -> Result<()> {
        self.send_frame(json!({
            "event": "setImage",
            "context": context,
            "payload": {"image": image, "target": 0}
        }))
    }

    fn show_ok(&self, context: &str) -> Result<()> {
        self.send_frame(json!({"event": "showOk", "context": context}))
    }

    fn show_alert(&self, context: &str) -> Result<()> {
        self.send_frame(json!({"event": "showAlert", "context": context}))
    }

    fn get_settings(&self, context: &str) -> Result<()> {
        self.send_frame(json!({"event": "getSettings", "context": context}))
    }

    fn send_to_property_inspector(&self, context: &str, payload: Value) -> Result<()> {
        self.send_frame(json!({
            "event": "sendToPropertyInspector",
            "context": context,
            "payload": payload
        }))
    }

    fn log_message(&self, message: &str) -> Result<()> {
        self.send_frame(json!({
            "event": "logMessage",
            "payload": {"message": message}
        }))
    }
}
