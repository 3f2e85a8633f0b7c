//! Stream Deck plugin that drives Warudo receivers over its WebSocket
//! control channel.
//!
//! The host runtime launches the plugin with registration parameters on the
//! command line ([`launch::LaunchArgs`]). Two reader threads feed a single
//! event channel: one for host events, one for the Warudo link. The main
//! loop owns all mutable state and dispatches through [`relay::handle_event`].

pub mod actions;
pub mod config;
pub mod host;
pub mod image_cache;
pub mod indicator;
pub mod launch;
pub mod protocol;
pub mod relay;
pub mod state;
pub mod warudo;

use crate::host::HostClient;
use crate::indicator::Indicator;
use crate::launch::LaunchArgs;
use crate::relay::Event;
use crate::state::PluginState;
use crate::warudo::WarudoLink;
use anyhow::{Context, Result};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

const CHANNEL_POLL: Duration = Duration::from_millis(50);

pub fn run(args: LaunchArgs) -> Result<()> {
    let config = config::load()?;

    let host = HostClient::connect(&args).context("Failed to connect to the Stream Deck host")?;
    let (tx, rx) = mpsc::channel();

    let reader_socket = host.socket();
    let reader_tx = tx.clone();
    thread::spawn(move || {
        if let Err(e) = host::run_reader(reader_socket, reader_tx.clone()) {
            eprintln!("Host reader stopped: {e:#}");
        }
        // The host owns the plugin lifecycle; when its socket goes away the
        // process is done.
        let _ = reader_tx.send(Event::Shutdown);
    });

    let link = WarudoLink::spawn(&config, tx);

    let mut state = PluginState::new();
    let mut indicator = Indicator::new(args.platform(), "images");
    let mut last_refresh = Instant::now();

    loop {
        match rx.recv_timeout(CHANNEL_POLL) {
            Ok(Event::Shutdown) => break,
            Ok(event) => {
                if let Err(e) = relay::handle_event(&mut state, &host, &link, &mut indicator, event)
                {
                    eprintln!("Event handling failed: {e:#}");
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        if last_refresh.elapsed() >= config.refresh_interval() {
            last_refresh = Instant::now();
            if let Err(e) = relay::request_toggle_refresh(&mut state, &host) {
                eprintln!("Toggle refresh failed: {e:#}");
            }
        }

        if state.revert_due(Instant::now()) {
            if let Err(e) = indicator.revert_all(&mut state, &host) {
                eprintln!("Image revert failed: {e:#}");
            }
        }
    }

    Ok(())
}
