//! Configuration management for registry nodes

use crate::blockchain::GENESIS_TIMESTAMP;
use crate::error::ChainError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub chain: ChainConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// Base URLs of peer nodes, e.g. `http://localhost:8082`.
    #[serde(default)]
    pub peers: Vec<String>,
    /// Upper bound for one block delivery to one peer, in humantime form ("5s", "500ms").
    #[serde(default = "default_broadcast_timeout")]
    pub broadcast_timeout: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
    #[serde(default = "default_genesis_timestamp")]
    pub genesis_timestamp: i64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            peers: Vec::new(),
            broadcast_timeout: default_broadcast_timeout(),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            genesis_timestamp: default_genesis_timestamp(),
        }
    }
}

fn default_node_id() -> String {
    "node-1".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_broadcast_timeout() -> String {
    "5s".to_string()
}

fn default_genesis_timestamp() -> i64 {
    GENESIS_TIMESTAMP
}

impl NetworkConfig {
    pub fn broadcast_timeout(&self) -> Result<Duration, ChainError> {
        humantime::parse_duration(&self.broadcast_timeout).map_err(|e| {
            ChainError::ConfigError(format!(
                "network.broadcast_timeout '{}' is not a duration: {}",
                self.broadcast_timeout, e
            ))
        })
    }
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.node.bind_address, self.node.port)
    }

    /// Validate critical values
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.node.node_id.trim().is_empty() {
            return Err(ChainError::ConfigError("node.node_id must not be empty".into()));
        }

        for peer in &self.network.peers {
            if !(peer.starts_with("http://") || peer.starts_with("https://")) {
                return Err(ChainError::ConfigError(format!(
                    "peer '{}' must be an http:// or https:// URL",
                    peer
                )));
            }
        }

        if self.network.broadcast_timeout()?.is_zero() {
            return Err(ChainError::ConfigError(
                "network.broadcast_timeout must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

/// Loads `config.toml` from the working directory, or defaults when it is absent.
pub fn load_config() -> Result<Config, ChainError> {
    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        load_config_from(DEFAULT_CONFIG_PATH)
    } else {
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }
}

pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let path = path.as_ref();
    let config_str = fs::read_to_string(path).map_err(|e| {
        ChainError::ConfigError(format!("could not open config {}: {}", path.display(), e))
    })?;
    let config: Config = toml::from_str(&config_str).map_err(|e| {
        ChainError::ConfigError(format!("could not decode config {}: {}", path.display(), e))
    })?;

    config.validate()?;
    Ok(config)
}
