//! TOML configuration parsing and validation.
//!
//! ```toml
//! [engine]
//! url = "https://localhost:9200"
//! index = "clinical_trials"
//! username = "admin"
//! verify_certs = false
//!
//! [server]
//! bind = "0.0.0.0:8080"
//!
//! [data]
//! path = "data/ctg-studies.json"
//! ```
//!
//! The engine password may be kept out of the file by setting
//! `TRIALS_ENGINE_PASSWORD`, which takes precedence over `engine.password`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable that overrides `engine.password`.
pub const PASSWORD_ENV: &str = "TRIALS_ENGINE_PASSWORD";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub engine: EngineConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub data: DataConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    pub url: String,
    #[serde(default = "default_index")]
    pub index: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_verify_certs")]
    pub verify_certs: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_index() -> String {
    "clinical_trials".to_string()
}
fn default_verify_certs() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    #[serde(default = "default_data_path")]
    pub path: PathBuf,
    #[serde(default = "default_bulk_chunk_size")]
    pub bulk_chunk_size: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: default_data_path(),
            bulk_chunk_size: default_bulk_chunk_size(),
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data/ctg-studies.json")
}
fn default_bulk_chunk_size() -> usize {
    500
}

impl EngineConfig {
    /// Password to send with basic auth, preferring the environment.
    pub fn resolved_password(&self) -> Option<String> {
        std::env::var(PASSWORD_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .or_else(|| self.password.clone())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    let url = config.engine.url.trim();
    if url.is_empty() {
        anyhow::bail!("engine.url must not be empty");
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!(
            "engine.url must start with http:// or https://, got '{}'",
            url
        );
    }

    if config.engine.index.trim().is_empty() {
        anyhow::bail!("engine.index must not be empty");
    }

    if config.engine.timeout_secs == 0 {
        anyhow::bail!("engine.timeout_secs must be > 0");
    }

    if config.data.bulk_chunk_size == 0 {
        anyhow::bail!("data.bulk_chunk_size must be > 0");
    }

    Ok(config)
}
