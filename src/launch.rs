//! Registration arguments passed by the Stream Deck host.
//!
//! The host launches the plugin binary with four flags: `-port` (the local
//! WebSocket port to register on), `-pluginUUID`, `-registerEvent`, and
//! `-info` (a JSON blob describing the host). Without them the plugin has no
//! host to talk to, so parse failures are fatal at startup.

use anyhow::{Context, Result};
use serde_json::Value;

/// Host platform, as reported in the registration info blob. Only the
/// mac/non-mac distinction matters: it changes how application identifiers
/// split into display names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Mac,
    Windows,
}

impl Platform {
    pub fn from_info(info: &Value) -> Self {
        let platform = info
            .get("application")
            .and_then(|a| a.get("platform"))
            .and_then(|p| p.as_str())
            .unwrap_or("");
        if platform == "mac" {
            Platform::Mac
        } else {
            Platform::Windows
        }
    }
}

/// Parsed registration arguments.
#[derive(Debug, Clone)]
pub struct LaunchArgs {
    pub port: u16,
    pub plugin_uuid: String,
    pub register_event: String,
    pub info: Value,
}

impl LaunchArgs {
    /// Parse the host's argument list (without the program name). Flags the
    /// host adds in future SDK versions are ignored.
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut port = None;
        let mut plugin_uuid = None;
        let mut register_event = None;
        let mut info = None;

        let mut iter = args.into_iter();
        while let Some(flag) = iter.next() {
            match flag.as_str() {
                "-port" => {
                    let value = iter.next().context("-port requires a value")?;
                    port = Some(
                        value
                            .parse::<u16>()
                            .with_context(|| format!("Invalid -port value: {value}"))?,
                    );
                }
                "-pluginUUID" => {
                    plugin_uuid = Some(iter.next().context("-pluginUUID requires a value")?);
                }
                "-registerEvent" => {
                    register_event = Some(iter.next().context("-registerEvent requires a value")?);
                }
                "-info" => {
                    let value = iter.next().context("-info requires a value")?;
                    info = Some(
                        serde_json::from_str(&value).context("Invalid -info JSON payload")?,
                    );
                }
                _ => {}
            }
        }

        Ok(Self {
            port: port.context("Missing -port argument")?,
            plugin_uuid: plugin_uuid.context("Missing -pluginUUID argument")?,
            register_event: register_event.context("Missing -registerEvent argument")?,
            info: info.unwrap_or(Value::Null),
        })
    }

    pub fn platform(&self) -> Platform {
        Platform::from_info(&self.info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_args(info: &str) -> Vec<String> {
        vec![
            "-port".into(),
            "28196".into(),
            "-pluginUUID".into(),
            "ABC123".into(),
            "-registerEvent".into(),
            "registerPlugin".into(),
            "-info".into(),
            info.into(),
        ]
    }

    #[test]
    fn parses_full_argument_set() {
        let args =
            LaunchArgs::parse(full_args(r#"{"application":{"platform":"windows"}}"#)).unwrap();
        assert_eq!(args.port, 28196);
        assert_eq!(args.plugin_uuid, "ABC123");
        assert_eq!(args.register_event, "registerPlugin");
        assert_eq!(args.platform(), Platform::Windows);
    }

    #[test]
    fn detects_mac_platform() {
        let args = LaunchArgs::parse(full_args(r#"{"application":{"platform":"mac"}}"#)).unwrap();
        assert_eq!(args.platform(), Platform::Mac);
    }

    #[test]
    fn missing_port_is_an_error() {
        let args = vec!["-pluginUUID".to_string(), "ABC".to_string()];
        assert!(LaunchArgs::parse(args).is_err());
    }

    #[test]
    fn malformed_info_is_an_error() {
        assert!(LaunchArgs::parse(full_args("not json")).is_err());
    }

    #[test]
    fn unknown_flags_are_ignored() {
        let mut args = full_args("{}");
        args.push("-future".into());
        args.push("whatever".into());
        assert!(LaunchArgs::parse(args).is_ok());
    }
}
