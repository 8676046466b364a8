//! Host-side runtime configuration.
//!
//! Covers only the workstation stand-ins (flash image path, bus bridge
//! endpoint); protocol constants are compiled in via `params`.

use anyhow::Result;
use busguard_common::transport::tcp::DEFAULT_BASE_PORT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_PATH: &str = "busguard-ap.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backing file for the provisioning flash page.
    pub flash_path: String,

    pub bus: BusConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Host the Component bridges listen on.
    pub host: String,

    /// Component at address A listens on `base_port + A`.
    pub base_port: u16,

    /// Receive timeout in milliseconds; a silent Component surfaces as a
    /// transport error after this long.
    pub timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flash_path: String::from("busguard-ap.flash"),
            bus: BusConfig::default(),
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            base_port: DEFAULT_BASE_PORT,
            timeout_ms: 2000,
        }
    }
}

impl Config {
    /// Load from `busguard-ap.toml`, or fall back to defaults when absent.
    pub fn load() -> Result<Self> {
        Self::load_from(CONFIG_PATH)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str("flash_path = \"/tmp/page.bin\"").unwrap();
        assert_eq!(config.flash_path, "/tmp/page.bin");
        assert_eq!(config.bus.base_port, DEFAULT_BASE_PORT);
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = Config::load_from("definitely-not-here.toml").unwrap();
        assert_eq!(config.bus.host, "127.0.0.1");
    }
}
