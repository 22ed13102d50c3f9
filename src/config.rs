//! Configuration file support
//!
//! Loads configuration from ~/.config/etherp/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::protocol::ChecksumOrder;
use crate::stats::UnitSystem;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub send: SendDefaults,

    #[serde(default)]
    pub recv: RecvDefaults,
}

/// Default settings for the sender
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SendDefaults {
    /// Interface used to send raw frames
    pub interface: Option<String>,

    /// Delay between frames (e.g., "100us", "1ms")
    pub interval: Option<String>,

    /// Fixed frame size (Ethernet payload bytes)
    pub size: Option<usize>,

    /// Cycle frame sizes instead of using a fixed size
    pub vary_size: Option<bool>,

    /// Lower bound when cycling sizes
    pub min_size: Option<usize>,

    /// Upper bound when cycling sizes
    pub max_size: Option<usize>,

    /// Skip payload filling and checksums
    pub no_data: Option<bool>,

    /// Checksum byte order on the wire (network, little)
    pub checksum_order: Option<ChecksumOrder>,

    /// Display units (decimal, binary)
    pub units: Option<UnitSystem>,

    /// Log file path (e.g., "~/.config/etherp/etherp.log")
    pub log_file: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    pub log_level: Option<String>,
}

/// Default settings for the receiver
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecvDefaults {
    /// Interface to listen on
    pub interface: Option<String>,

    /// Put the interface in promiscuous mode
    pub promisc: Option<bool>,

    /// Skip checksum verification
    pub no_verify: Option<bool>,

    /// Checksum byte order on the wire (network, little)
    pub checksum_order: Option<ChecksumOrder>,

    /// Display units (decimal, binary)
    pub units: Option<UnitSystem>,

    /// Log file path (e.g., "~/.config/etherp/etherp.log")
    pub log_file: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration from the default path.
    /// Returns default config if file doesn't exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("etherp")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.send.interface.is_none());
        assert!(config.recv.promisc.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[send]
interface = "enp3s0"
interval = "250us"
vary_size = true
max_size = 9000
checksum_order = "little"
units = "binary"

[recv]
interface = "enp3s0"
promisc = true
log_level = "debug"
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.send.interface.as_deref(), Some("enp3s0"));
        assert_eq!(config.send.interval.as_deref(), Some("250us"));
        assert_eq!(config.send.vary_size, Some(true));
        assert_eq!(config.send.max_size, Some(9000));
        assert_eq!(config.send.checksum_order, Some(ChecksumOrder::Little));
        assert_eq!(config.send.units, Some(UnitSystem::Binary));
        assert_eq!(config.recv.promisc, Some(true));
        assert_eq!(config.recv.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_partial_config() {
        let config: Config = toml::from_str("[recv]\nno_verify = true\n").unwrap();
        assert_eq!(config.recv.no_verify, Some(true));
        assert!(config.send.size.is_none());
    }

    #[test]
    fn test_rejects_unknown_order() {
        let result: Result<Config, _> = toml::from_str("[send]\nchecksum_order = \"middle\"\n");
        assert!(result.is_err());
    }
}
