//! Warudo connection manager.
//!
//! One background worker owns the socket lifecycle: connect to the control
//! endpoint, forward parsed inbound frames to the main event channel, and
//! reconnect per the configured policy. Only one socket instance is ever
//! live; its state is mirrored in a shared [`LinkStatus`].

use crate::config::{Config, ReconnectPolicy};
use crate::protocol::{OutboundMessage, PeerMessage};
use crate::relay::Event;
use anyhow::{Context, Result};
use std::io;
use std::net::TcpStream;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{connect, Error as WsError, Message, WebSocket};

type WarudoSocket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Poll interval for socket reads while the link is open. Kept well under
/// the toggle refresh interval so sends never queue behind a full cycle.
const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// How often the worker rechecks the resume switch while suspended.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Absent,
    Connecting,
    Open,
    Closed,
}

/// Send-side seam between the relay and the connection manager. The resume
/// and suspend switches only affect the on-close reconnect policy; the
/// watchdog policy ignores them.
pub trait PeerLink {
    fn is_open(&self) -> bool;
    fn send(&self, message: &OutboundMessage) -> Result<()>;
    /// Arm reconnection (Warudo launched).
    fn resume(&self) {}
    /// Stop reconnect attempts until resumed (Warudo quit).
    fn suspend(&self) {}
}

pub struct WarudoLink {
    socket: Arc<Mutex<Option<WarudoSocket>>>,
    status: Arc<Mutex<LinkStatus>>,
    /// The on-close policy's cancel switch. Starts armed so the first
    /// connect attempt happens even if the host never reports a launch.
    armed: Arc<Mutex<bool>>,
}

impl WarudoLink {
    /// Spawn the connection worker. The initial connect attempt happens
    /// immediately under both policies.
    pub fn spawn(config: &Config, tx: Sender<Event>) -> Self {
        let link = Self {
            socket: Arc::new(Mutex::new(None)),
            status: Arc::new(Mutex::new(LinkStatus::Absent)),
            armed: Arc::new(Mutex::new(true)),
        };

        let socket = Arc::clone(&link.socket);
        let status = Arc::clone(&link.status);
        let armed = Arc::clone(&link.armed);
        let config = config.clone();
        thread::spawn(move || run_worker(&config, &socket, &status, &armed, &tx));

        link
    }

    pub fn status(&self) -> LinkStatus {
        *self.status.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PeerLink for WarudoLink {
    fn is_open(&self) -> bool {
        self.status() == LinkStatus::Open
    }

    fn send(&self, message: &OutboundMessage) -> Result<()> {
        let mut guard = self.socket.lock().unwrap_or_else(|e| e.into_inner());
        let socket = guard.as_mut().context("Warudo socket is not connected")?;
        socket
            .send(Message::Text(message.to_json().to_string()))
            .context("Failed to send frame to Warudo")
    }

    fn resume(&self) {
        *self.armed.lock().unwrap_or_else(|e| e.into_inner()) = true;
    }

    fn suspend(&self) {
        *self.armed.lock().unwrap_or_else(|e| e.into_inner()) = false;
    }
}

fn set_status(status: &Mutex<LinkStatus>, value: LinkStatus) {
    *status.lock().unwrap_or_else(|e| e.into_inner()) = value;
}

fn run_worker(
    config: &Config,
    socket_slot: &Mutex<Option<WarudoSocket>>,
    status: &Mutex<LinkStatus>,
    armed: &Mutex<bool>,
    tx: &Sender<Event>,
) {
    loop {
        if config.reconnect.policy == ReconnectPolicy::OnClose
            && !*armed.lock().unwrap_or_else(|e| e.into_inner())
        {
            thread::sleep(IDLE_POLL);
            continue;
        }

        set_status(status, LinkStatus::Connecting);
        match open_socket(&config.endpoint) {
            Ok(new_socket) => {
                *socket_slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(new_socket);
                set_status(status, LinkStatus::Open);
                eprintln!("Connected to Warudo at {}", config.endpoint);
                if tx.send(Event::LinkUp).is_err() {
                    return;
                }

                let keep_running = read_until_closed(socket_slot, tx);

                *socket_slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
                set_status(status, LinkStatus::Closed);
                eprintln!("Disconnected from Warudo");
                if !keep_running || tx.send(Event::LinkDown).is_err() {
                    return;
                }
            }
            Err(e) => {
                set_status(status, LinkStatus::Closed);
                eprintln!("Warudo connect failed: {e:#}");
            }
        }

        let delay = match config.reconnect.policy {
            ReconnectPolicy::OnClose => config.reconnect.delay(),
            ReconnectPolicy::Watchdog => config.reconnect.watchdog_interval(),
        };
        thread::sleep(delay);
    }
}

fn open_socket(endpoint: &str) -> Result<WarudoSocket> {
    let (socket, _response) =
        connect(endpoint).with_context(|| format!("Failed to connect to {endpoint}"))?;

    if let MaybeTlsStream::Plain(stream) = socket.get_ref() {
        stream
            .set_read_timeout(Some(READ_TIMEOUT))
            .context("Failed to set Warudo socket read timeout")?;
    }

    Ok(socket)
}

/// Read inbound frames until the socket closes or errors. Returns false
/// when the main loop is gone and the worker should exit.
fn read_until_closed(socket_slot: &Mutex<Option<WarudoSocket>>, tx: &Sender<Event>) -> bool {
    loop {
        let frame = {
            let mut guard = socket_slot.lock().unwrap_or_else(|e| e.into_inner());
            let Some(socket) = guard.as_mut() else {
                return true;
            };
            match socket.read() {
                Ok(message) => Some(message),
                Err(WsError::Io(e))
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    None
                }
                // Closed or errored either way; the worker reconnects.
                Err(_) => return true,
            }
        };

        match frame {
            Some(Message::Text(text)) => match serde_json::from_str::<PeerMessage>(&text) {
                // Unmatched action tags are silently ignored.
                Ok(PeerMessage::Unknown) => {}
                Ok(message) => {
                    if tx.send(Event::Peer(message)).is_err() {
                        return false;
                    }
                }
                Err(e) => eprintln!("Dropping unparseable Warudo frame: {e}"),
            },
            Some(Message::Close(_)) => return true,
            Some(_) => {}
            // Lock released; give the send path a window before re-polling.
            None => thread::sleep(Duration::from_millis(5)),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::PeerLink;
    use crate::protocol::OutboundMessage;
    use anyhow::Result;
    use serde_json::Value;
    use std::cell::{Cell, RefCell};

    /// `PeerLink` double that records outbound frames as JSON.
    pub struct RecordingLink {
        pub open: Cell<bool>,
        pub fail_sends: Cell<bool>,
        pub resumes: Cell<u32>,
        pub suspends: Cell<u32>,
        sent: RefCell<Vec<Value>>,
    }

    impl RecordingLink {
        pub fn new(open: bool) -> Self {
            Self {
                open: Cell::new(open),
                fail_sends: Cell::new(false),
                resumes: Cell::new(0),
                suspends: Cell::new(0),
                sent: RefCell::new(Vec::new()),
            }
        }

        pub fn sent(&self) -> Vec<Value> {
            self.sent.borrow().clone()
        }
    }

    impl PeerLink for RecordingLink {
        fn is_open(&self) -> bool {
            self.open.get()
        }

        fn send(&self, message: &OutboundMessage) -> Result<()> {
            if self.fail_sends.get() {
                anyhow::bail!("simulated send failure");
            }
            self.sent.borrow_mut().push(message.to_json());
            Ok(())
        }

        fn resume(&self) {
            self.resumes.set(self.resumes.get() + 1);
        }

        fn suspend(&self) {
            self.suspends.set(self.suspends.get() + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_poll_stays_under_refresh_interval() {
        // Sends must not queue behind a full refresh cycle.
        assert!(READ_TIMEOUT < Duration::from_millis(500));
    }
}
