//! Host-side runtime configuration for the Component bridge endpoint.

use anyhow::Result;
use busguard_common::transport::tcp::DEFAULT_BASE_PORT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_PATH: &str = "busguard-component.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bus: BusConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Interface the bridge listens on.
    pub host: String,

    /// This Component listens on `base_port + id_to_addr(COMPONENT_ID)`.
    pub base_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self { bus: BusConfig::default() }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { host: String::from("127.0.0.1"), base_port: DEFAULT_BASE_PORT }
    }
}

impl Config {
    /// Load from `busguard-component.toml`, or fall back to defaults.
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
