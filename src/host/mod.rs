//! Stream Deck host boundary: event parsing, the `HostHandle` command seam,
//! and the socket reader feeding the main event channel.

mod client;
mod events;

pub use client::{HostClient, HostHandle, HostSocket};
pub use events::{ApplicationPayload, HostEvent, SettingsPayload};

use crate::relay::Event;
use anyhow::Result;
use std::io;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tungstenite::{Error as WsError, Message};

/// Poll the host socket and forward parsed events into the main event
/// channel. Returns when the host closes the socket; the host owns the
/// plugin lifecycle, so that ends the process.
pub fn run_reader(socket: Arc<Mutex<HostSocket>>, tx: Sender<Event>) -> Result<()> {
    loop {
        let frame = {
            let mut socket = socket.lock().unwrap_or_else(|e| e.into_inner());
            match socket.read() {
                Ok(message) => Some(message),
                Err(WsError::Io(e))
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    None
                }
                Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        };

        match frame {
            Some(Message::Text(text)) => match serde_json::from_str::<HostEvent>(&text) {
                Ok(HostEvent::Unknown) => {}
                Ok(event) => {
                    if tx.send(Event::Host(event)).is_err() {
                        return Ok(());
                    }
                }
                Err(e) => eprintln!("Ignoring unparseable host frame: {e}"),
            },
            Some(Message::Close(_)) => return Ok(()),
            Some(_) => {}
            // Lock released; give command writers a window before re-polling.
            None => thread::sleep(Duration::from_millis(5)),
        }
    }
}
