//! Plugin configuration.
//!
//! The host starts the plugin with its working directory set to the plugin
//! bundle, so an optional `warudo-deck.toml` next to the binary can override
//! the Warudo endpoint, the reconnect policy, and the refresh cadence. A
//! missing file means defaults; a corrupt file is an error with context.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Warudo's fixed local control endpoint.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:19069";

/// Config file name, resolved relative to the plugin bundle.
pub const CONFIG_FILE: &str = "warudo-deck.toml";

/// How the connection manager recovers from a dropped Warudo socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReconnectPolicy {
    /// Schedule a fixed-delay reconnect when the socket closes; the host's
    /// application launch/terminate events arm and cancel it.
    OnClose,
    /// Reconnect unconditionally on a fixed interval after every close,
    /// ignoring the launch/terminate switch.
    Watchdog,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconnectConfig {
    pub policy: ReconnectPolicy,
    /// Delay before a reconnect attempt under the on-close policy.
    pub delay_ms: u64,
    /// Reconnect interval under the watchdog policy.
    pub watchdog_interval_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            policy: ReconnectPolicy::OnClose,
            delay_ms: 1000,
            watchdog_interval_ms: 1000,
        }
    }
}

impl ReconnectConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// WebSocket endpoint of the Warudo control channel.
    pub endpoint: String,
    pub reconnect: ReconnectConfig,
    /// Toggle-visual refresh interval.
    pub refresh_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            reconnect: ReconnectConfig::default(),
            refresh_interval_ms: 500,
        }
    }
}

impl Config {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

/// Load the config from the plugin directory, or defaults if absent.
pub fn load() -> Result<Config> {
    load_from(Path::new(CONFIG_FILE))
}

pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_plugin() {
        let config = Config::default();
        assert_eq!(config.endpoint, "ws://localhost:19069");
        assert_eq!(config.reconnect.policy, ReconnectPolicy::OnClose);
        assert_eq!(config.reconnect.delay(), Duration::from_millis(1000));
        assert_eq!(config.refresh_interval(), Duration::from_millis(500));
    }

    #[test]
    fn parses_watchdog_policy() {
        let config: Config = toml::from_str(
            r#"
            endpoint = "ws://localhost:19070"

            [reconnect]
            policy = "watchdog"
            watchdog_interval_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.endpoint, "ws://localhost:19070");
        assert_eq!(config.reconnect.policy, ReconnectPolicy::Watchdog);
        assert_eq!(config.reconnect.watchdog_interval(), Duration::from_millis(250));
        // Untouched fields keep their defaults
        assert_eq!(config.refresh_interval_ms, 500);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str(
            r#"
            [reconnect]
            policy = "hope"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn corrupt_file_is_a_contextual_error() {
        let path = std::env::temp_dir()
            .join(format!("warudo-deck-bad-{}.toml", std::process::id()));
        fs::write(&path, "endpoint = [not toml").unwrap();

        let err = load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_from(Path::new("definitely/not/here.toml")).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }
}
