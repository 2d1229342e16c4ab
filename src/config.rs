use crate::error::{RelayError, Result};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    pub recognizer: RecognizerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: i64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecognizerConfig {
    pub endpoint: String,
    #[serde(default = "default_recognizer_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_ttl_secs() -> i64 {
    300
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_recognizer_timeout_secs() -> u64 {
    10
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = "config.toml";
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            RelayError::Config(format!("Failed to read config file '{}': {}", config_path, e))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }

    /// Base URL the handoff links are built against. The config file value
    /// wins; the PUBLIC_BASE_URL environment variable is the fallback.
    pub fn resolved_base_url(&self) -> Option<String> {
        self.server
            .public_base_url
            .clone()
            .or_else(|| std::env::var("PUBLIC_BASE_URL").ok())
            .map(|url| url.trim_end_matches('/').to_string())
    }
}
